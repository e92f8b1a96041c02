use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::block::{finish_digest, SealedBlock, UnsealedBlock};
use crate::config::MinerConfig;
use crate::constants::MAX_TARGET_BITS;
use crate::error::{ChainError, Result};
use crate::Hash;

/// Shared flag a caller flips to abandon an in-flight search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Difficulty settings and the mining / verification predicate.
///
/// A digest is valid iff, read as a big-endian 256-bit integer, it is below
/// `2^(256 - target_bits)`. That is the same as having at least `target_bits`
/// leading zero bits, which is how it is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    target_bits: u32,
    max_nonce: u64,
}

impl ProofOfWork {
    pub fn new(target_bits: u32) -> Result<Self> {
        if target_bits > MAX_TARGET_BITS {
            return Err(ChainError::InvalidTargetBits(target_bits));
        }
        Ok(Self {
            target_bits,
            max_nonce: u64::MAX,
        })
    }

    pub fn from_config(cfg: &MinerConfig) -> Result<Self> {
        Ok(Self::new(cfg.target_bits)?.with_max_nonce(cfg.max_nonce))
    }

    /// Cap the search at `max_nonce` (inclusive).
    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    pub fn target_bits(&self) -> u32 {
        self.target_bits
    }

    pub fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    pub fn meets_target(&self, hash: &Hash) -> bool {
        count_leading_zero_bits(hash) >= self.target_bits
    }

    /// Search nonces `0, 1, 2, ...` and seal the block with the first one whose
    /// digest meets the target.
    pub fn mine(&self, block: UnsealedBlock, cancel: &CancelToken) -> Result<SealedBlock> {
        debug!(
            target_bits = self.target_bits,
            payload_len = block.payload.len(),
            "mining block"
        );
        let prefix = block.prefix();
        let mut nonce = 0u64;
        loop {
            if cancel.is_cancelled() {
                warn!(nonce, "mining cancelled");
                return Err(ChainError::Cancelled);
            }
            let hash = finish_digest(&prefix, nonce);
            if self.meets_target(&hash) {
                return self.seal(block, nonce, hash);
            }
            if nonce == self.max_nonce {
                warn!(max_nonce = self.max_nonce, "nonce space exhausted");
                return Err(ChainError::ExhaustedNonceSpace {
                    max_nonce: self.max_nonce,
                });
            }
            nonce += 1;
        }
    }

    /// Seal a winner, re-checking it the same way any acceptor would.
    pub(crate) fn seal(
        &self,
        block: UnsealedBlock,
        nonce: u64,
        hash: Hash,
    ) -> Result<SealedBlock> {
        let sealed = block.seal(nonce, hash);
        if !self.validate(&sealed) {
            return Err(ChainError::InvalidProofOfWork {
                hash: hex::encode(hash),
            });
        }
        info!(nonce, hash = %hex::encode(hash), "mined block");
        Ok(sealed)
    }

    /// The stored hash must equal the digest of the stored fields and meet the
    /// target. Tampering and honest-but-wrong blocks both come back `false`.
    pub fn validate(&self, block: &SealedBlock) -> bool {
        let digest = block.recompute_digest();
        digest == block.hash && self.meets_target(&digest)
    }
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(payload: &[u8]) -> UnsealedBlock {
        UnsealedBlock::with_timestamp(payload.to_vec(), vec![0x11; 32], 1_600_000_000)
    }

    #[test]
    fn leading_zero_bits_examples() {
        let mut h = [0u8; 32];
        assert_eq!(count_leading_zero_bits(&h), 256);
        h[0] = 0x0F; // 00001111
        assert_eq!(count_leading_zero_bits(&h), 4);
        h = [0u8; 32];
        h[1] = 0x80; // 00000000 10000000
        assert_eq!(count_leading_zero_bits(&h), 8);
        h[1] = 0x40; // 01000000
        assert_eq!(count_leading_zero_bits(&h), 9);
    }

    #[test]
    fn predicate_matches_integer_target() {
        // target_bits = 8 -> target = 2^248, i.e. 0x01 followed by 31 zero bytes.
        let pow = ProofOfWork::new(8).unwrap();
        let mut target = [0u8; 32];
        target[0] = 0x01;
        assert!(!pow.meets_target(&target));

        let mut just_below = [0xffu8; 32];
        just_below[0] = 0x00;
        assert!(pow.meets_target(&just_below));
    }

    #[test]
    fn rejects_target_bits_out_of_range() {
        assert_eq!(
            ProofOfWork::new(256).unwrap_err(),
            ChainError::InvalidTargetBits(256)
        );
        assert!(ProofOfWork::new(MAX_TARGET_BITS).is_ok());
    }

    #[test]
    fn from_config_carries_bounds() {
        let cfg = MinerConfig {
            target_bits: 10,
            max_nonce: 500,
            ..MinerConfig::default()
        };
        let pow = ProofOfWork::from_config(&cfg).unwrap();
        assert_eq!(pow.target_bits(), 10);
        assert_eq!(pow.max_nonce(), 500);
    }

    #[test]
    fn mine_finds_smallest_valid_nonce() {
        let pow = ProofOfWork::new(8).unwrap();
        let block = candidate(b"smallest");
        let sealed = pow.mine(block.clone(), &CancelToken::new()).unwrap();
        assert!(pow.validate(&sealed));
        assert!(count_leading_zero_bits(sealed.hash()) >= 8);
        for nonce in 0..sealed.nonce() {
            assert!(!pow.meets_target(&block.digest(nonce)));
        }
    }

    #[test]
    fn zero_difficulty_accepts_first_nonce() {
        let pow = ProofOfWork::new(0).unwrap();
        let sealed = pow.mine(candidate(b"free"), &CancelToken::new()).unwrap();
        assert_eq!(sealed.nonce(), 0);
        assert!(pow.validate(&sealed));
    }

    #[test]
    fn exhausted_nonce_space_is_an_error() {
        let pow = ProofOfWork::new(64).unwrap().with_max_nonce(16);
        let err = pow.mine(candidate(b"hard"), &CancelToken::new()).unwrap_err();
        assert_eq!(err, ChainError::ExhaustedNonceSpace { max_nonce: 16 });
    }

    #[test]
    fn cancelled_token_stops_mining() {
        let pow = ProofOfWork::new(MAX_TARGET_BITS).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = pow.mine(candidate(b"never"), &cancel).unwrap_err();
        assert_eq!(err, ChainError::Cancelled);
    }

    #[test]
    fn validate_rejects_tampered_fields() {
        let pow = ProofOfWork::new(8).unwrap();
        let sealed = pow.mine(candidate(b"payload"), &CancelToken::new()).unwrap();
        assert!(pow.validate(&sealed));

        let mut b = sealed.clone();
        b.payload[0] ^= 0x01;
        assert!(!pow.validate(&b));

        let mut b = sealed.clone();
        b.prev_hash[31] ^= 0x80;
        assert!(!pow.validate(&b));

        let mut b = sealed.clone();
        b.timestamp += 1;
        assert!(!pow.validate(&b));

        let mut b = sealed.clone();
        b.nonce += 1;
        assert!(!pow.validate(&b));

        let mut b = sealed;
        b.hash[0] ^= 0x01;
        assert!(!pow.validate(&b));
    }

    #[test]
    fn validate_rejects_consistent_hash_below_difficulty() {
        // Digest matches the fields but was never mined for this difficulty.
        let pow = ProofOfWork::new(MAX_TARGET_BITS).unwrap();
        let block = candidate(b"unmined");
        let hash = block.digest(0);
        let forged = block.seal(0, hash);
        assert_eq!(forged.recompute_digest(), *forged.hash());
        assert!(!pow.validate(&forged));
    }
}
