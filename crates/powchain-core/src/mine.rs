use rayon::prelude::*;
use tracing::{debug, warn};

use crate::block::{finish_digest, SealedBlock, UnsealedBlock};
use crate::error::{ChainError, Result};
use crate::pow::{CancelToken, ProofOfWork};
use crate::Hash;

enum Probe {
    Found(u64, Hash),
    Cancelled,
}

impl ProofOfWork {
    /// Mines a block by searching nonces in parallel until a header hash meets
    /// the target. Rayon splits `0..=max_nonce` across its pool; whichever
    /// worker hits first wins, so the nonce is not necessarily the smallest.
    pub fn mine_parallel(
        &self,
        block: UnsealedBlock,
        cancel: &CancelToken,
    ) -> Result<SealedBlock> {
        debug!(
            target_bits = self.target_bits(),
            threads = rayon::current_num_threads(),
            "mining block in parallel"
        );
        // Hash the nonce-independent header once; workers clone the state.
        let prefix = block.prefix();

        let found = (0..=self.max_nonce())
            .into_par_iter()
            .find_map_any(|nonce| {
                if cancel.is_cancelled() {
                    return Some(Probe::Cancelled);
                }
                let hash = finish_digest(&prefix, nonce);
                self.meets_target(&hash).then_some(Probe::Found(nonce, hash))
            });

        if cancel.is_cancelled() {
            warn!("parallel mining cancelled");
            return Err(ChainError::Cancelled);
        }
        match found {
            Some(Probe::Found(nonce, hash)) => self.seal(block, nonce, hash),
            Some(Probe::Cancelled) => Err(ChainError::Cancelled),
            None => {
                warn!(max_nonce = self.max_nonce(), "nonce space exhausted");
                Err(ChainError::ExhaustedNonceSpace {
                    max_nonce: self.max_nonce(),
                })
            }
        }
    }

    /// Sequential or parallel search, as configured by the caller.
    pub fn mine_with(
        &self,
        block: UnsealedBlock,
        parallel: bool,
        cancel: &CancelToken,
    ) -> Result<SealedBlock> {
        if parallel {
            self.mine_parallel(block, cancel)
        } else {
            self.mine(block, cancel)
        }
    }
}
