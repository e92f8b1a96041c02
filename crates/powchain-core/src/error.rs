use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Every nonce up to and including `max_nonce` was tried without a hit.
    /// The candidate is discarded; retrying with a fresh timestamp or payload
    /// changes the search space.
    #[error("nonce space exhausted (max nonce {max_nonce}) without meeting the target")]
    ExhaustedNonceSpace { max_nonce: u64 },

    #[error("mining cancelled")]
    Cancelled,

    /// The block does not extend the current tip, usually because another
    /// writer committed first. Retry against the fresh tip.
    #[error("block does not extend the tip: expected prev hash {expected:?}, found {found:?}")]
    InvalidPredecessor { expected: String, found: String },

    #[error("proof of work rejected for block {hash}")]
    InvalidProofOfWork { hash: String },

    #[error("target bits {0} out of range")]
    InvalidTargetBits(u32),

    #[error("config error: {0}")]
    Config(String),
}
