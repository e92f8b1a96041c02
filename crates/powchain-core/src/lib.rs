//! Proof-of-work block linking: candidate blocks, the nonce search that seals
//! them, and an append-only chain that only admits sealed blocks extending
//! its tip.
//!
//! ```no_run
//! use powchain_core::{Blockchain, ProofOfWork};
//!
//! let pow = ProofOfWork::new(16)?;
//! let mut chain = Blockchain::new(pow)?;
//! chain.append(b"a->b: 1".to_vec())?;
//! assert!(pow.validate(chain.tip()));
//! # Ok::<(), powchain_core::ChainError>(())
//! ```

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
mod mine;
pub mod pow;

pub use block::{compute_digest, header_bytes, SealedBlock, UnsealedBlock};
pub use chain::{Blockchain, SharedBlockchain};
pub use config::MinerConfig;
pub use error::{ChainError, Result};
pub use pow::{count_leading_zero_bits, CancelToken, ProofOfWork};

pub type Hash = [u8; constants::HASH_SIZE];
