use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Hash;

/// Seconds since the Unix epoch, negative when the clock reads before 1970.
pub fn unix_timestamp() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Raw header preimage: `prev_hash || payload || decimal(timestamp) || decimal(nonce)`.
///
/// External codecs that re-serialize a block must reproduce exactly this
/// byte order for `compute_digest` to round-trip.
pub fn header_bytes(prev_hash: &[u8], payload: &[u8], timestamp: i64, nonce: u64) -> Vec<u8> {
    let timestamp = timestamp.to_string();
    let nonce = nonce.to_string();
    let mut bytes =
        Vec::with_capacity(prev_hash.len() + payload.len() + timestamp.len() + nonce.len());
    bytes.extend_from_slice(prev_hash);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(timestamp.as_bytes());
    bytes.extend_from_slice(nonce.as_bytes());
    bytes
}

/// Hasher state after absorbing every header field except the nonce.
pub fn header_prefix(prev_hash: &[u8], payload: &[u8], timestamp: i64) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash);
    hasher.update(payload);
    hasher.update(timestamp.to_string().as_bytes());
    hasher
}

/// Finish a digest from a shared prefix. The prefix is cloned, never consumed,
/// so one prefix serves the whole nonce search.
pub fn finish_digest(prefix: &Sha256, nonce: u64) -> Hash {
    let mut hasher = prefix.clone();
    hasher.update(nonce.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn compute_digest(prev_hash: &[u8], payload: &[u8], timestamp: i64, nonce: u64) -> Hash {
    finish_digest(&header_prefix(prev_hash, payload, timestamp), nonce)
}

/// A candidate block that has not been mined yet. It has no hash and cannot
/// enter a chain until `ProofOfWork` turns it into a `SealedBlock`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsealedBlock {
    pub(crate) timestamp: i64,
    pub(crate) payload: Vec<u8>,
    pub(crate) prev_hash: Vec<u8>,
}

impl UnsealedBlock {
    pub fn new(payload: impl Into<Vec<u8>>, prev_hash: impl Into<Vec<u8>>) -> Self {
        Self::with_timestamp(payload, prev_hash, unix_timestamp())
    }

    pub fn with_timestamp(
        payload: impl Into<Vec<u8>>,
        prev_hash: impl Into<Vec<u8>>,
        timestamp: i64,
    ) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
            prev_hash: prev_hash.into(),
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn prev_hash(&self) -> &[u8] {
        &self.prev_hash
    }

    pub fn prefix(&self) -> Sha256 {
        header_prefix(&self.prev_hash, &self.payload, self.timestamp)
    }

    pub fn digest(&self, nonce: u64) -> Hash {
        compute_digest(&self.prev_hash, &self.payload, self.timestamp, nonce)
    }

    /// Only the miner seals, after it has found `nonce` and `hash`.
    pub(crate) fn seal(self, nonce: u64, hash: Hash) -> SealedBlock {
        SealedBlock {
            timestamp: self.timestamp,
            payload: self.payload,
            prev_hash: self.prev_hash,
            hash,
            nonce,
        }
    }
}

/// A mined block. Fields are read-only outside the crate.
///
/// Deserializing produces a block whose proof has not been checked; run it
/// through `ProofOfWork::validate` (or `Blockchain::commit`) before trusting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlock {
    pub(crate) timestamp: i64,
    #[serde(with = "hex::serde")]
    pub(crate) payload: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub(crate) prev_hash: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub(crate) hash: Hash,
    pub(crate) nonce: u64,
}

impl SealedBlock {
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn prev_hash(&self) -> &[u8] {
        &self.prev_hash
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// Digest of the stored fields, independent of the stored `hash`.
    pub fn recompute_digest(&self) -> Hash {
        compute_digest(&self.prev_hash, &self.payload, self.timestamp, self.nonce)
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        header_bytes(&self.prev_hash, &self.payload, self.timestamp, self.nonce)
    }
}

impl fmt::Display for SealedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prev. hash: {}", hex::encode(&self.prev_hash))?;
        writeln!(f, "Data: {}", String::from_utf8_lossy(&self.payload))?;
        writeln!(f, "Hash: {}", hex::encode(self.hash))?;
        write!(f, "Nonce: {}", self.nonce)
    }
}
