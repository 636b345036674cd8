//! `dab inspect`: decode a DA message envelope, or a whole
//! `sequenceBatchesValidium` call, and print it as JSON.

use anyhow::Context;
use clap::Args;
use dab_core::DaMessage;
use serde_json::{json, Value};

use crate::l1::SequenceBatchesValidium;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Hex bytes, `0x` optional.
    pub data: String,

    /// Treat the input as `sequenceBatchesValidium` calldata and decode the
    /// embedded DA message as well.
    #[arg(long)]
    pub calldata: bool,
}

/// Decode an envelope into its JSON form.
pub fn inspect_envelope(bytes: &[u8]) -> anyhow::Result<Value> {
    let message = DaMessage::decode(bytes).context("invalid DA message envelope")?;
    Ok(serde_json::to_value(message)?)
}

/// Decode sequencing calldata; the DA message field is expanded when it
/// decodes and reported as an error string otherwise.
pub fn inspect_calldata(bytes: &[u8]) -> anyhow::Result<Value> {
    let call = SequenceBatchesValidium::decode_calldata(bytes)?;
    let message = match DaMessage::decode(&call.data_availability_message) {
        Ok(m) => serde_json::to_value(m)?,
        Err(e) => json!({ "error": e.to_string() }),
    };
    let mut value = serde_json::to_value(&call)?;
    value["decodedMessage"] = message;
    Ok(value)
}

pub fn run_inspect(args: &InspectArgs) -> anyhow::Result<u8> {
    let bytes = hex::decode(args.data.trim().trim_start_matches("0x")).context("input is not hex")?;
    let value = if args.calldata {
        inspect_calldata(&bytes)?
    } else {
        inspect_envelope(&bytes)?
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::l1::ValidiumBatchData;
    use dab_core::{BlobPointer, B256};

    fn pointer() -> DaMessage {
        DaMessage::BlobPointer(BlobPointer::new(42, 3, B256::repeat_byte(0xab)))
    }

    #[test]
    fn envelope_as_json() {
        let value = inspect_envelope(&pointer().encode()).unwrap();
        assert_eq!(value["type"], "blob_pointer");
        assert_eq!(value["message"]["blockHeight"], 42);
        assert_eq!(value["message"]["extrinsicIndex"], 3);
    }

    #[test]
    fn bad_envelope_is_an_error() {
        let err = inspect_envelope(&[0x07, 0x00]).unwrap_err();
        assert!(format!("{err:#}").contains("invalid DA message envelope"));
    }

    #[test]
    fn calldata_expands_message() {
        let call = SequenceBatchesValidium {
            batches: vec![ValidiumBatchData {
                transactions_hash: B256::repeat_byte(1),
                forced_global_exit_root: B256::ZERO,
                forced_timestamp: 0,
                forced_block_hash_l1: B256::ZERO,
            }],
            l1_info_tree_leaf_count: 1,
            max_sequence_timestamp: 2,
            expected_final_acc_input_hash: B256::ZERO,
            l2_coinbase: [0x11; 20],
            data_availability_message: pointer().encode(),
        };
        let value = inspect_calldata(&call.encode_calldata()).unwrap();
        assert_eq!(value["batches"].as_array().unwrap().len(), 1);
        assert_eq!(value["l2Coinbase"], format!("0x{}", "11".repeat(20)));
        assert_eq!(value["decodedMessage"]["type"], "blob_pointer");
    }
}
