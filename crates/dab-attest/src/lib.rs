//! # dab-attest: Attestation Resolution
//!
//! Two external collaborators of the DA bridge live here:
//!
//! - The **bridge proof service** ([`BridgeClient`]): polled over HTTP after
//!   a submission until it serves the Merkle inclusion proof, which becomes
//!   the [`MerkleProofInput`](dab_core::MerkleProofInput) pointer payload.
//! - The **attestation contract** ([`AttestationReader`]): read over
//!   Ethereum JSON-RPC to turn a proof leaf back into DA chain coordinates
//!   during retrieval.
//!
//! [`JsonRpcClient`] is the shared JSON-RPC 2.0 transport.

pub mod attestation;
pub mod bridge;
pub mod error;
pub mod rpc;

pub use attestation::{
    attest_calldata, attestations_calldata, selector, AttestationReader, AttestationRecord,
    EvmAttestationReader, StaticAttestations,
};
pub use bridge::{BridgeApiResponse, BridgeClient, BridgeConfig};
pub use error::{AttestationError, JsonRpcError};
pub use rpc::JsonRpcClient;
