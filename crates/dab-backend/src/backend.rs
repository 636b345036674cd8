//! # Submission and Retrieval Orchestration
//!
//! [`DaBackend`] ties the DA chain, the bridge proof service, the
//! attestation contract, and the fallback store together.
//!
//! ## Submission ([`DaBackend::post_sequence`])
//!
//! 1. RLP-encode the batches into one blob.
//! 2. Submit the blob and wait for finalized inclusion.
//! 3. With the bridge enabled, poll for the Merkle proof and wrap it as a
//!    `MERKLE_PROOF` envelope. Otherwise wrap a [`BlobPointer`] to the
//!    inclusion coordinates as a `BLOB_POINTER` envelope.
//! 4. Mirror every batch into the fallback store. Failures here are logged
//!    and never fail the submission.
//!
//! ## Retrieval ([`DaBackend::get_sequence`])
//!
//! 1. When the caller supplies batch hashes and a fallback store is
//!    configured, return the stored batches if every one is present.
//! 2. Otherwise decode the envelope, resolve chain coordinates (directly for
//!    a blob pointer, through the attestation contract for a proof), read
//!    the blob, and RLP-decode it.

use std::sync::Arc;
use std::time::Instant;

use dab_attest::{AttestationReader, BridgeClient, EvmAttestationReader, JsonRpcClient};
use dab_core::{
    decode_batches, encode_batches, encode_envelope, keccak256, BlobPointer, Cancellation,
    DaMessage, MessageKind, B256,
};
use dab_store::{FallbackStore, FsObjectStore, ObjectStore};

use crate::chain::{run_blocking, DaChain, IndexKind};
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Chain coordinates of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobLocation {
    pub block_number: u32,
    pub index: u32,
    pub kind: IndexKind,
}

/// The DA bridge orchestrator.
///
/// Every collaborator is optional; operations that need a missing one fail
/// with [`BackendError::NotConfigured`].
#[derive(Debug, Clone, Default)]
pub struct DaBackend {
    chain: Option<Arc<dyn DaChain>>,
    bridge: Option<BridgeClient>,
    attestations: Option<Arc<dyn AttestationReader>>,
    fallback: Option<FallbackStore>,
}

impl DaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: Arc<dyn DaChain>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Produce Merkle proof pointers through `bridge`.
    pub fn with_bridge(mut self, bridge: BridgeClient) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_attestations(mut self, reader: Arc<dyn AttestationReader>) -> Self {
        self.attestations = Some(reader);
        self
    }

    pub fn with_fallback(mut self, store: FallbackStore) -> Self {
        self.fallback = Some(store);
        self
    }

    /// Assemble a backend from configuration. The chain client is supplied
    /// by the caller.
    pub async fn from_config(
        config: &BackendConfig,
        chain: Option<Arc<dyn DaChain>>,
    ) -> Result<Self, BackendError> {
        let mut backend = Self::new();
        backend.chain = chain;

        if config.bridge.enabled {
            backend.bridge = Some(BridgeClient::new(&config.bridge.client_config())?);
            tracing::info!(api_url = %config.bridge.api_url, "bridge proofs enabled");
        }

        if let (Some(rpc_url), Some(contract)) = (&config.l1_rpc_url, &config.attestation_contract)
        {
            let rpc = JsonRpcClient::new(rpc_url)?;
            let reader = EvmAttestationReader::new(rpc, contract.clone())?;
            backend.attestations = Some(Arc::new(reader));
            tracing::info!(contract = %contract, "attestation reader configured");
        }

        if let Some(store) = object_store(config).await? {
            tracing::info!(
                backend = store.name(),
                prefix = %config.fallback.object_prefix,
                concurrency = config.fallback.effective_concurrency(),
                "fallback store configured"
            );
            backend.fallback = Some(FallbackStore::new(store, config.fallback.clone()));
        }

        Ok(backend)
    }

    pub fn fallback(&self) -> Option<&FallbackStore> {
        self.fallback.as_ref()
    }

    pub fn bridge_enabled(&self) -> bool {
        self.bridge.is_some()
    }

    fn chain(&self) -> Result<Arc<dyn DaChain>, BackendError> {
        self.chain
            .clone()
            .ok_or(BackendError::NotConfigured("DA chain client"))
    }

    fn attestations(&self) -> Result<&Arc<dyn AttestationReader>, BackendError> {
        self.attestations
            .as_ref()
            .ok_or(BackendError::NotConfigured("attestation reader"))
    }

    /// Submit `batches` to the DA chain and return the envelope that points
    /// at them.
    pub async fn post_sequence(
        &self,
        batches: &[Vec<u8>],
        cancel: &Cancellation,
    ) -> Result<Vec<u8>, BackendError> {
        let chain = self.chain()?;
        let blob = encode_batches(batches);
        let commitment = keccak256(&blob);
        tracing::info!(batches = batches.len(), size = blob.len(), "submitting sequence to DA chain");

        let started = Instant::now();
        let details = run_blocking(cancel, move || chain.submit_and_finalize(&blob))
            .await?
            .map_err(BackendError::ChainSubmissionFailed)?;
        tracing::info!(
            block_number = details.block_number,
            block_hash = %details.block_hash,
            tx_index = details.tx_index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sequence finalized on DA chain"
        );

        let envelope = match &self.bridge {
            Some(bridge) => {
                let proof = bridge
                    .fetch_proof(details.block_hash, details.tx_index, cancel)
                    .await?;
                tracing::info!(leaf = %proof.leaf, "built merkle proof pointer");
                encode_envelope(MessageKind::MerkleProof, &proof.encode())
            }
            None => {
                let pointer =
                    BlobPointer::new(details.block_number, details.tx_index, commitment);
                tracing::info!(commitment = %commitment, "built blob pointer");
                encode_envelope(MessageKind::BlobPointer, &pointer.encode())
            }
        };

        if let Some(store) = &self.fallback {
            let result = store.put_multiple(batches.to_vec(), cancel).await?;
            if result.is_complete() {
                tracing::info!(batches = batches.len(), "sequence mirrored to fallback store");
            } else {
                tracing::warn!(error = %result.errors, "fallback store mirror incomplete");
            }
        }

        Ok(envelope)
    }

    /// Return the batches behind `envelope`, preferring the fallback store
    /// when every hash in `batch_hashes` is stored.
    pub async fn get_sequence(
        &self,
        batch_hashes: &[B256],
        envelope: &[u8],
        cancel: &Cancellation,
    ) -> Result<Vec<Vec<u8>>, BackendError> {
        if let (Some(store), false) = (&self.fallback, batch_hashes.is_empty()) {
            let result = store.get_multiple_by_hash(batch_hashes, cancel).await?;
            if result.is_complete() {
                if let Ok(batches) = result.into_result() {
                    tracing::info!(batches = batches.len(), "sequence served from fallback store");
                    return Ok(batches);
                }
            } else {
                tracing::info!(
                    error = %result.errors,
                    "fallback store incomplete, reading from DA chain"
                );
            }
        }

        let message = DaMessage::decode(envelope)?;
        let location = self.locate(&message, cancel).await?;
        let blob = self.fetch(location, cancel).await?;
        Ok(decode_batches(&blob)?)
    }

    /// Raw bytes stored under `hash`: the fallback store first, then the
    /// chain blob attested for `hash` as a leaf.
    pub async fn get_off_chain_data(
        &self,
        hash: &B256,
        cancel: &Cancellation,
    ) -> Result<Vec<u8>, BackendError> {
        let mut store_error = None;
        if let Some(store) = &self.fallback {
            match cancel.run(store.get_by_hash(hash)).await? {
                Ok(data) => {
                    tracing::info!(hash = %hash, "off-chain data served from fallback store");
                    return Ok(data);
                }
                Err(err) => {
                    tracing::info!(hash = %hash, error = %err, "fallback store miss");
                    store_error = Some(err);
                }
            }
        }

        if self.attestations.is_none() || self.chain.is_none() {
            return Err(match store_error {
                Some(err) => err.into(),
                None => BackendError::NotConfigured("fallback store or attestation reader"),
            });
        }

        let location = self.resolve_leaf(*hash, cancel).await?;
        self.fetch(location, cancel).await
    }

    /// Chain coordinates for a decoded message.
    pub async fn locate(
        &self,
        message: &DaMessage,
        cancel: &Cancellation,
    ) -> Result<BlobLocation, BackendError> {
        match message {
            DaMessage::BlobPointer(pointer) => Ok(BlobLocation {
                block_number: pointer.block_height,
                index: pointer.extrinsic_index,
                kind: IndexKind::ByExtrinsicIndex,
            }),
            DaMessage::MerkleProof(proof) => self.resolve_leaf(proof.leaf, cancel).await,
        }
    }

    async fn resolve_leaf(
        &self,
        leaf: B256,
        cancel: &Cancellation,
    ) -> Result<BlobLocation, BackendError> {
        let attestations = self.attestations()?;
        let record = cancel.run(attestations.attestation(leaf)).await??;
        let index = u32::try_from(record.leaf_index).map_err(|_| BackendError::RetrievalFailed {
            block_number: record.block_number,
            index: record.leaf_index,
            kind: IndexKind::ByLeafIndex,
            source: crate::chain::ChainError::NoBlob {
                block_number: record.block_number,
                index: record.leaf_index,
                kind: IndexKind::ByLeafIndex,
            },
        })?;
        Ok(BlobLocation {
            block_number: record.block_number,
            index,
            kind: IndexKind::ByLeafIndex,
        })
    }

    async fn fetch(
        &self,
        location: BlobLocation,
        cancel: &Cancellation,
    ) -> Result<Vec<u8>, BackendError> {
        let chain = self.chain()?;
        let BlobLocation {
            block_number,
            index,
            kind,
        } = location;
        let blob = run_blocking(cancel, move || chain.fetch_blob(block_number, index, kind))
            .await?
            .map_err(|source| BackendError::RetrievalFailed {
                block_number,
                index: u128::from(index),
                kind,
                source,
            })?;
        tracing::info!(block_number, index, kind = %kind, size = blob.len(), "blob read from DA chain");
        Ok(blob)
    }
}

async fn object_store(
    config: &BackendConfig,
) -> Result<Option<Arc<dyn ObjectStore>>, BackendError> {
    if config.s3_enabled {
        return s3_store(config).await.map(Some);
    }
    Ok(config
        .fs_store_dir
        .as_ref()
        .map(|dir| Arc::new(FsObjectStore::new(dir.clone())) as Arc<dyn ObjectStore>))
}

#[cfg(feature = "s3")]
async fn s3_store(config: &BackendConfig) -> Result<Arc<dyn ObjectStore>, BackendError> {
    let store = dab_store::S3ObjectStore::connect(&config.s3).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
async fn s3_store(_config: &BackendConfig) -> Result<Arc<dyn ObjectStore>, BackendError> {
    Err(BackendError::Config(
        "S3 fallback store requested but built without the `s3` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use dab_store::{FallbackConfig, MemoryObjectStore};

    fn memory_backend() -> (Arc<MemoryChain>, Arc<MemoryObjectStore>, DaBackend) {
        let chain = Arc::new(MemoryChain::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let backend = DaBackend::new()
            .with_chain(chain.clone())
            .with_fallback(FallbackStore::new(objects.clone(), FallbackConfig::default()));
        (chain, objects, backend)
    }

    #[tokio::test]
    async fn missing_chain_is_not_configured() {
        let err = DaBackend::new()
            .post_sequence(&[b"a".to_vec()], &Cancellation::never())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn blob_pointer_locates_by_extrinsic_index() {
        let (_, _, backend) = memory_backend();
        let message = DaMessage::BlobPointer(BlobPointer::new(7, 3, B256::ZERO));
        assert_eq!(
            backend.locate(&message, &Cancellation::never()).await.unwrap(),
            BlobLocation {
                block_number: 7,
                index: 3,
                kind: IndexKind::ByExtrinsicIndex
            }
        );
    }

    #[tokio::test]
    async fn merkle_proof_needs_attestation_reader() {
        let (_, _, backend) = memory_backend();
        let message = DaMessage::MerkleProof(Default::default());
        assert!(matches!(
            backend.locate(&message, &Cancellation::never()).await,
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn off_chain_data_from_store() {
        let (_, objects, backend) = memory_backend();
        let hash = keccak256(b"payload");
        objects
            .put_object(&hex::encode(hash), b"payload".to_vec(), None)
            .await
            .unwrap();
        let data = backend
            .get_off_chain_data(&hash, &Cancellation::never())
            .await
            .unwrap();
        assert_eq!(data, b"payload");
    }

    #[tokio::test]
    async fn off_chain_miss_without_reader_reports_store_error() {
        let (_, _, backend) = memory_backend();
        let err = backend
            .get_off_chain_data(&B256::repeat_byte(1), &Cancellation::never())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::FallbackStore(_)), "{err:?}");
    }

    #[tokio::test]
    async fn from_config_with_fs_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig {
            fs_store_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let backend = DaBackend::from_config(&config, None).await.unwrap();
        assert!(!backend.bridge_enabled());
        assert_eq!(backend.fallback().unwrap().backend().name(), "filesystem");
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn s3_requires_feature() {
        let mut config = BackendConfig {
            s3_enabled: true,
            ..Default::default()
        };
        config.s3.bucket = "b".into();
        config.s3.region = "r".into();
        assert!(matches!(
            DaBackend::from_config(&config, None).await,
            Err(BackendError::Config(_))
        ));
    }
}
