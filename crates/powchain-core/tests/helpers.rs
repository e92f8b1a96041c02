#![allow(dead_code)]

use powchain_core::{Blockchain, ProofOfWork, SealedBlock};
use tracing_subscriber::EnvFilter;

pub const TEST_TARGET_BITS: u32 = 8;

pub fn init_tracing() {
    // Several tests race to install the subscriber; only the first wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_pow() -> ProofOfWork {
    ProofOfWork::new(TEST_TARGET_BITS).expect("valid target bits")
}

pub fn create_test_chain(appends: usize) -> Blockchain {
    let mut chain = Blockchain::new(test_pow()).expect("Failed to mine genesis");
    for i in 0..appends {
        chain
            .append(format!("payload-{i}").into_bytes())
            .expect("Failed to append block");
    }
    chain
}

/// Re-decode `block` through JSON with one bit of the hex field `field`
/// flipped, the way a corrupted copy would arrive from storage or a peer.
pub fn flip_bit(block: &SealedBlock, field: &str, byte: usize, mask: u8) -> SealedBlock {
    let mut json = serde_json::to_value(block).expect("serialize block");
    let mut bytes = hex::decode(json[field].as_str().expect("hex field")).expect("decode hex");
    bytes[byte] ^= mask;
    json[field] = serde_json::Value::String(hex::encode(bytes));
    serde_json::from_value(json).expect("deserialize block")
}

/// Same as `flip_bit` but for the integer fields `timestamp` and `nonce`.
pub fn bump_field(block: &SealedBlock, field: &str) -> SealedBlock {
    let mut json = serde_json::to_value(block).expect("serialize block");
    let value = json[field].as_i64().expect("integer field");
    json[field] = serde_json::Value::from(value + 1);
    serde_json::from_value(json).expect("deserialize block")
}
