//! # Migration Tests
//!
//! Runs the migrator against mock collaborators:
//!
//! | Server | Serves |
//! |--------|--------|
//! | L1 RPC | `eth_getBlockByNumber` with sequencing transactions |
//! | DAC | `sync_getOffChainData` per batch hash |
//! | Turbo-DA | `POST /v1/submit_raw_data` |
//!
//! The fallback store is in memory.

use std::sync::Arc;
use std::time::Duration;

use dab_attest::JsonRpcClient;
use dab_cli::dac::DacClient;
use dab_cli::l1::{L1Scanner, SequenceBatchesValidium, ValidiumBatchData};
use dab_cli::migrate::{MigrationReport, Migrator};
use dab_cli::turbo::TurboDaClient;
use dab_core::{cancellation, keccak256, Cancellation, RetryPolicy, B256};
use dab_store::{FallbackConfig, FallbackStore, MemoryObjectStore, SecretString};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BATCH_A: &[u8] = b"batch-a-data";
const BATCH_B: &[u8] = b"batch-b-data";

fn rollup() -> String {
    format!("0x{}", "aa".repeat(20))
}

fn sequence_input(hashes: &[B256]) -> String {
    let call = SequenceBatchesValidium {
        batches: hashes
            .iter()
            .map(|h| ValidiumBatchData {
                transactions_hash: *h,
                forced_global_exit_root: B256::ZERO,
                forced_timestamp: 0,
                forced_block_hash_l1: B256::ZERO,
            })
            .collect(),
        l1_info_tree_leaf_count: 1,
        max_sequence_timestamp: 1_700_000_000,
        expected_final_acc_input_hash: B256::ZERO,
        l2_coinbase: [0x01; 20],
        data_availability_message: vec![],
    };
    format!("0x{}", hex::encode(call.encode_calldata()))
}

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

async fn l1_with_block(block: u64, result: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getBlockByNumber",
            "params": [format!("0x{block:x}"), true]
        })))
        .respond_with(rpc_result(result))
        .mount(&server)
        .await;
    server
}

/// Block 100: one sequencing call with both batches, plus unrelated traffic.
async fn l1_server() -> MockServer {
    let hashes = [keccak256(BATCH_A), keccak256(BATCH_B)];
    l1_with_block(
        100,
        json!({
            "number": "0x64",
            "transactions": [
                {"hash": "0x01", "to": format!("0x{}", "bb".repeat(20)), "input": sequence_input(&hashes)},
                {"hash": "0x02", "to": null, "input": "0x6080"},
                {"hash": "0x03", "to": rollup().to_uppercase().replace("0X", "0x"), "input": sequence_input(&hashes)}
            ]
        }),
    )
    .await
}

async fn serve_batch(dac: &MockServer, data: &[u8], served: &[u8]) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "sync_getOffChainData",
            "params": [keccak256(data).to_string()]
        })))
        .respond_with(rpc_result(json!(format!("0x{}", hex::encode(served)))))
        .mount(dac)
        .await;
}

fn memory_store() -> (Arc<MemoryObjectStore>, FallbackStore) {
    let objects = Arc::new(MemoryObjectStore::new());
    (objects.clone(), FallbackStore::new(objects, FallbackConfig::default()))
}

fn migrator(l1: &MockServer, dac: &MockServer, store: FallbackStore) -> Migrator {
    let scanner = L1Scanner::new(JsonRpcClient::new(&l1.uri()).unwrap(), &rollup()).unwrap();
    let dac = DacClient::new(JsonRpcClient::new(&dac.uri()).unwrap());
    Migrator::new(scanner, dac, store)
        .with_retry_policy(RetryPolicy::fixed(3, Duration::from_millis(10)))
}

#[tokio::test]
async fn migrates_sequenced_batches() {
    let l1 = l1_server().await;
    let dac = MockServer::start().await;
    serve_batch(&dac, BATCH_A, BATCH_A).await;
    serve_batch(&dac, BATCH_B, BATCH_B).await;

    let turbo = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/submit_raw_data"))
        .and(header("x-api-key", "turbo-key"))
        .and(header("content-type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"submission_id\":\"1\"}"))
        .expect(2)
        .mount(&turbo)
        .await;

    let (objects, store) = memory_store();
    let turbo_client = TurboDaClient::new(&turbo.uri(), SecretString::new("turbo-key")).unwrap();
    let report = migrator(&l1, &dac, store.clone())
        .with_turbo(turbo_client)
        .run(100, 100, &Cancellation::never())
        .await;

    assert_eq!(
        report,
        MigrationReport {
            blocks_scanned: 1,
            batches_found: 2,
            batches_migrated: 2,
            ..Default::default()
        }
    );
    assert!(report.is_clean());
    assert_eq!(objects.len(), 2);
    assert_eq!(store.get_by_hash(&keccak256(BATCH_A)).await.unwrap(), BATCH_A);
    assert_eq!(store.get_by_hash(&keccak256(BATCH_B)).await.unwrap(), BATCH_B);
}

#[tokio::test]
async fn dac_failures_skip_the_batch() {
    let l1 = l1_server().await;
    let dac = MockServer::start().await;
    // Wrong content is not retried.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": [keccak256(BATCH_A).to_string()]})))
        .respond_with(rpc_result(json!("0xdeadbeef")))
        .expect(1)
        .mount(&dac)
        .await;
    // Server errors are retried until the budget runs out.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": [keccak256(BATCH_B).to_string()]})))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&dac)
        .await;

    let (objects, store) = memory_store();
    let report = migrator(&l1, &dac, store)
        .run(100, 100, &Cancellation::never())
        .await;

    assert_eq!(report.fetch_failures, 2);
    assert_eq!(report.batches_migrated, 0);
    assert!(!report.is_clean());
    assert!(objects.is_empty());
}

#[tokio::test]
async fn turbo_rejection_is_an_upload_failure() {
    let l1 = l1_server().await;
    let dac = MockServer::start().await;
    serve_batch(&dac, BATCH_A, BATCH_A).await;
    serve_batch(&dac, BATCH_B, BATCH_B).await;
    let turbo = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(6)
        .mount(&turbo)
        .await;

    let (objects, store) = memory_store();
    let report = migrator(&l1, &dac, store)
        .with_turbo(TurboDaClient::new(&turbo.uri(), SecretString::new("wrong")).unwrap())
        .run(100, 100, &Cancellation::never())
        .await;

    assert_eq!(report.upload_failures, 2);
    assert_eq!(report.batches_migrated, 0);
    assert!(objects.is_empty(), "store is written only after Turbo-DA accepts");
}

#[tokio::test]
async fn unknown_block_is_counted_and_skipped() {
    let l1 = l1_with_block(7, Value::Null).await;
    let dac = MockServer::start().await;
    let (_, store) = memory_store();

    let report = migrator(&l1, &dac, store)
        .run(7, 7, &Cancellation::never())
        .await;

    assert_eq!(report.blocks_failed, 1);
    assert_eq!(report.blocks_scanned, 0);
    assert!(!report.interrupted);
}

#[tokio::test]
async fn cancelled_run_is_interrupted() {
    let l1 = l1_server().await;
    let dac = MockServer::start().await;
    let (_, store) = memory_store();
    let (handle, token) = cancellation();
    handle.cancel();

    let report = migrator(&l1, &dac, store).run(100, 105, &token).await;

    assert!(report.interrupted);
    assert_eq!(report.blocks_scanned, 0);
    assert!(!report.is_clean());
}
