//! # Batch Migration
//!
//! Copies historical validium batches into the fallback store. For every L1
//! block in `[start, end]` the migrator collects the `transactionsHash` of
//! each batch sequenced to the rollup contract, fetches the batch data from
//! a DAC node, optionally submits it to Turbo-DA, and writes it to the
//! fallback store under its hash.
//!
//! A batch that cannot be fetched or uploaded after `max_attempts` is
//! counted and skipped; the run carries on. A block whose transactions
//! cannot be read is skipped the same way. The whole run is bounded by a
//! timeout; when it fires (or on Ctrl-C) the report is marked interrupted.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use dab_attest::JsonRpcClient;
use dab_backend::{BackendConfig, DaBackend};
use dab_core::{
    cancellation, run_with_retry, run_with_retry_if, CancelHandle, Cancellation, RetryError,
    RetryPolicy, B256,
};
use dab_store::{FallbackStore, SecretString, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::dac::{DacClient, DacError};
use crate::l1::L1Scanner;
use crate::turbo::{TurboDaClient, TurboDaError};

/// Base delay of the per-batch exponential backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Arguments for `dab migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// L1 JSON-RPC endpoint.
    #[arg(long, env = "DA_MIGRATE_L1_RPC_URL")]
    pub l1_rpc_url: String,

    /// Address of the validium rollup contract.
    #[arg(long, env = "DA_ROLLUP_CONTRACT")]
    pub rollup_contract: String,

    /// First L1 block to scan.
    #[arg(long, env = "DA_MIGRATE_START_BLOCK")]
    pub start_block: u64,

    /// Last L1 block to scan, inclusive.
    #[arg(long, env = "DA_MIGRATE_END_BLOCK")]
    pub end_block: u64,

    /// DAC node serving `sync_getOffChainData`.
    #[arg(long, env = "DA_DAC_URL")]
    pub dac_url: String,

    /// Turbo-DA base URL. Requires `--turbo-da-api-key`.
    #[arg(long, env = "DA_TURBO_DA_URL", requires = "turbo_da_api_key")]
    pub turbo_da_url: Option<String>,

    #[arg(
        long,
        env = "DA_TURBO_DA_API_KEY",
        hide_env_values = true,
        requires = "turbo_da_url"
    )]
    pub turbo_da_api_key: Option<SecretString>,

    /// Attempts per DAC fetch and per upload.
    #[arg(long, env = "DA_MIGRATE_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    /// Overall run timeout in minutes.
    #[arg(long, env = "DA_MIGRATE_TIMEOUT_MINS", default_value_t = 10)]
    pub timeout_mins: u64,
}

/// Counters for one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub blocks_scanned: u64,
    pub blocks_failed: u64,
    pub batches_found: u64,
    pub batches_migrated: u64,
    pub fetch_failures: u64,
    pub upload_failures: u64,
    /// The run stopped before reaching the end block.
    pub interrupted: bool,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        !self.interrupted
            && self.blocks_failed == 0
            && self.fetch_failures == 0
            && self.upload_failures == 0
    }
}

#[derive(Error, Debug)]
enum UploadError {
    #[error(transparent)]
    Turbo(#[from] TurboDaError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Moves batches from a DAC into the fallback store.
#[derive(Debug, Clone)]
pub struct Migrator {
    scanner: L1Scanner,
    dac: DacClient,
    turbo: Option<TurboDaClient>,
    store: FallbackStore,
    policy: RetryPolicy,
}

impl Migrator {
    pub fn new(scanner: L1Scanner, dac: DacClient, store: FallbackStore) -> Self {
        Self {
            scanner,
            dac,
            turbo: None,
            store,
            policy: RetryPolicy::exponential(5, DEFAULT_RETRY_BASE_DELAY),
        }
    }

    pub fn with_turbo(mut self, turbo: TurboDaClient) -> Self {
        self.turbo = Some(turbo);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Migrate every batch sequenced in blocks `start..=end`.
    pub async fn run(&self, start: u64, end: u64, cancel: &Cancellation) -> MigrationReport {
        let mut report = MigrationReport::default();

        'blocks: for block in start..=end {
            let hashes = match cancel.run(self.scanner.batch_hashes(block)).await {
                Err(_) => {
                    report.interrupted = true;
                    break;
                }
                Ok(Err(e)) => {
                    tracing::warn!(block, error = %e, "failed to read L1 block, skipping");
                    report.blocks_failed += 1;
                    continue;
                }
                Ok(Ok(hashes)) => hashes,
            };
            report.blocks_scanned += 1;
            report.batches_found += hashes.len() as u64;
            if hashes.is_empty() {
                tracing::debug!(block, "no sequenced batches");
                continue;
            }
            tracing::info!(block, batches = hashes.len(), "processing block");

            for hash in hashes {
                match self.migrate_batch(&hash, cancel).await {
                    BatchOutcome::Migrated => report.batches_migrated += 1,
                    BatchOutcome::FetchFailed => report.fetch_failures += 1,
                    BatchOutcome::UploadFailed => report.upload_failures += 1,
                    BatchOutcome::Cancelled => {
                        report.interrupted = true;
                        break 'blocks;
                    }
                }
            }
        }

        tracing::info!(
            blocks_scanned = report.blocks_scanned,
            batches_migrated = report.batches_migrated,
            fetch_failures = report.fetch_failures,
            upload_failures = report.upload_failures,
            interrupted = report.interrupted,
            "migration finished"
        );
        report
    }

    async fn migrate_batch(&self, hash: &B256, cancel: &Cancellation) -> BatchOutcome {
        let fetch = run_with_retry_if(
            self.policy,
            cancel,
            |_| self.dac.get_off_chain_data(hash),
            DacError::is_retryable,
        );
        let data = match cancel.run(fetch).await {
            Err(_) | Ok(Err(RetryError::Cancelled)) => return BatchOutcome::Cancelled,
            Ok(Err(e)) => {
                tracing::warn!(hash = %hash, error = %e, "DAC fetch failed, skipping batch");
                return BatchOutcome::FetchFailed;
            }
            Ok(Ok(data)) => data,
        };
        tracing::debug!(hash = %hash, size = data.len(), "fetched batch from DAC");

        let upload = run_with_retry(self.policy, cancel, |_| self.upload(hash, &data));
        match cancel.run(upload).await {
            Err(_) | Ok(Err(RetryError::Cancelled)) => BatchOutcome::Cancelled,
            Ok(Err(e)) => {
                tracing::warn!(hash = %hash, error = %e, "upload failed, skipping batch");
                BatchOutcome::UploadFailed
            }
            Ok(Ok(())) => {
                tracing::info!(hash = %hash, size = data.len(), "batch migrated");
                BatchOutcome::Migrated
            }
        }
    }

    async fn upload(&self, hash: &B256, data: &[u8]) -> Result<(), UploadError> {
        if let Some(turbo) = &self.turbo {
            turbo.submit_raw_data(data).await?;
        }
        self.store.put(data.to_vec(), *hash, None).await?;
        Ok(())
    }
}

enum BatchOutcome {
    Migrated,
    FetchFailed,
    UploadFailed,
    Cancelled,
}

/// Build a migrator from CLI arguments and the fallback store in `config`.
pub async fn build_migrator(args: &MigrateArgs, config: &BackendConfig) -> anyhow::Result<Migrator> {
    let backend = DaBackend::from_config(config, None)
        .await
        .context("failed to initialize fallback store")?;
    let Some(store) = backend.fallback().cloned() else {
        bail!("no fallback store configured; set DA_S3_ENABLED or DA_FS_STORE_DIR");
    };

    let l1 = JsonRpcClient::new(&args.l1_rpc_url).context("invalid L1 RPC URL")?;
    let scanner = L1Scanner::new(l1, &args.rollup_contract)?;
    let dac = DacClient::new(JsonRpcClient::new(&args.dac_url).context("invalid DAC URL")?);

    let mut migrator = Migrator::new(scanner, dac, store).with_retry_policy(RetryPolicy::exponential(
        args.max_attempts.max(1),
        DEFAULT_RETRY_BASE_DELAY,
    ));
    match (&args.turbo_da_url, &args.turbo_da_api_key) {
        (Some(url), Some(key)) => {
            migrator = migrator.with_turbo(TurboDaClient::new(url, key.clone())?);
        }
        (None, None) => {}
        _ => bail!("--turbo-da-url and --turbo-da-api-key must be set together"),
    }
    Ok(migrator)
}

/// `dab migrate`. Prints the report as JSON; exit code 1 unless the run was
/// clean.
pub async fn run_migrate(args: &MigrateArgs, config: &BackendConfig) -> anyhow::Result<u8> {
    if args.start_block > args.end_block {
        bail!(
            "start block {} is after end block {}",
            args.start_block,
            args.end_block
        );
    }
    let migrator = build_migrator(args, config).await?;

    let (handle, cancel) = cancellation();
    let timeout = Duration::from_secs(args.timeout_mins.saturating_mul(60));
    spawn_interrupts(handle, timeout);

    tracing::info!(
        start_block = args.start_block,
        end_block = args.end_block,
        timeout_mins = args.timeout_mins,
        turbo_da = args.turbo_da_url.is_some(),
        "starting migration"
    );
    let report = migrator.run(args.start_block, args.end_block, &cancel).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.is_clean() { 0 } else { 1 })
}

fn spawn_interrupts(handle: CancelHandle, timeout: Duration) {
    let on_timeout = handle.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!(timeout_secs = timeout.as_secs(), "migration timed out");
        on_timeout.cancel();
    });
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted");
            handle.cancel();
        }
    });
}
