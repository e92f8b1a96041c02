use std::slice;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::block::{SealedBlock, UnsealedBlock};
use crate::config::MinerConfig;
use crate::constants::GENESIS_PAYLOAD;
use crate::error::{ChainError, Result};
use crate::pow::{CancelToken, ProofOfWork};

/// Append-only sequence of sealed blocks, index 0 being genesis.
///
/// There is no way to remove, replace or reorder a committed block. Blocks are
/// held behind `Arc` so snapshots share them instead of copying payloads.
#[derive(Clone, Debug)]
pub struct Blockchain {
    pow: ProofOfWork,
    parallel: bool,
    blocks: Vec<Arc<SealedBlock>>,
}

impl Blockchain {
    /// Mine the default genesis block with `pow` and start a chain on it.
    pub fn new(pow: ProofOfWork) -> Result<Self> {
        Self::bootstrap(pow, false, GENESIS_PAYLOAD.as_bytes())
    }

    pub fn with_config(cfg: &MinerConfig) -> Result<Self> {
        cfg.validate()?;
        let pow = ProofOfWork::from_config(cfg)?;
        Self::bootstrap(pow, cfg.parallel, cfg.genesis_payload.as_bytes())
    }

    fn bootstrap(pow: ProofOfWork, parallel: bool, genesis_payload: &[u8]) -> Result<Self> {
        let candidate = UnsealedBlock::new(genesis_payload, Vec::<u8>::new());
        let genesis = pow.mine_with(candidate, parallel, &CancelToken::new())?;
        info!(hash = %hex::encode(genesis.hash()), "genesis block sealed");
        Ok(Self {
            pow,
            parallel,
            blocks: vec![Arc::new(genesis)],
        })
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Mine `payload` on top of the tip and commit it.
    pub fn append(&mut self, payload: impl Into<Vec<u8>>) -> Result<&SealedBlock> {
        self.append_with_cancel(payload, &CancelToken::new())
    }

    /// Like `append`, but `cancel` can abandon the search. A failed or
    /// cancelled attempt leaves the chain untouched.
    pub fn append_with_cancel(
        &mut self,
        payload: impl Into<Vec<u8>>,
        cancel: &CancelToken,
    ) -> Result<&SealedBlock> {
        let candidate = UnsealedBlock::new(payload, self.tip().hash().to_vec());
        let sealed = self.pow.mine_with(candidate, self.parallel, cancel)?;
        self.commit(sealed)
    }

    /// Accept a block mined elsewhere. It must extend the current tip and
    /// carry a valid proof of work.
    pub fn commit(&mut self, block: SealedBlock) -> Result<&SealedBlock> {
        let tip_hash = self.tip().hash();
        if block.prev_hash() != tip_hash.as_slice() {
            warn!(height = self.blocks.len(), "rejected block with stale predecessor");
            return Err(ChainError::InvalidPredecessor {
                expected: hex::encode(tip_hash),
                found: hex::encode(block.prev_hash()),
            });
        }
        if !self.pow.validate(&block) {
            warn!(height = self.blocks.len(), "rejected block with invalid proof of work");
            return Err(ChainError::InvalidProofOfWork {
                hash: hex::encode(block.hash()),
            });
        }
        info!(
            height = self.blocks.len(),
            nonce = block.nonce(),
            hash = %hex::encode(block.hash()),
            "block committed"
        );
        self.blocks.push(Arc::new(block));
        Ok(self.tip())
    }

    pub fn blocks(&self) -> &[Arc<SealedBlock>] {
        &self.blocks
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<SealedBlock>> {
        self.blocks.iter()
    }

    pub fn get(&self, height: usize) -> Option<&SealedBlock> {
        self.blocks.get(height).map(Arc::as_ref)
    }

    pub fn genesis(&self) -> &SealedBlock {
        &self.blocks[0]
    }

    pub fn tip(&self) -> &SealedBlock {
        self.tip_arc()
    }

    fn tip_arc(&self) -> &Arc<SealedBlock> {
        // Genesis is always present.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// A chain always holds its genesis block, so this is false.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Re-check genesis, linkage and proof of work for every block.
    pub fn verify(&self) -> Result<()> {
        let genesis = self.genesis();
        if !genesis.is_genesis() {
            return Err(ChainError::InvalidPredecessor {
                expected: String::new(),
                found: hex::encode(genesis.prev_hash()),
            });
        }
        for (height, block) in self.blocks.iter().enumerate() {
            if height > 0 {
                let prev = &self.blocks[height - 1];
                if block.prev_hash() != prev.hash().as_slice() {
                    return Err(ChainError::InvalidPredecessor {
                        expected: hex::encode(prev.hash()),
                        found: hex::encode(block.prev_hash()),
                    });
                }
            }
            if !self.pow.validate(block) {
                return Err(ChainError::InvalidProofOfWork {
                    hash: hex::encode(block.hash()),
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Blockchain {
    type Item = &'a Arc<SealedBlock>;
    type IntoIter = slice::Iter<'a, Arc<SealedBlock>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Handle for sharing one chain between threads.
///
/// Mining runs without holding the lock, against the tip seen when the append
/// started. Commit takes the write lock and re-checks linkage, so if another
/// writer moved the tip meanwhile the append fails with `InvalidPredecessor`
/// and nothing is written.
#[derive(Clone, Debug)]
pub struct SharedBlockchain {
    inner: Arc<RwLock<Blockchain>>,
}

impl SharedBlockchain {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    pub fn append(
        &self,
        payload: impl Into<Vec<u8>>,
        cancel: &CancelToken,
    ) -> Result<Arc<SealedBlock>> {
        let (pow, parallel, prev_hash) = {
            let chain = self.read();
            (*chain.proof_of_work(), chain.is_parallel(), chain.tip().hash().to_vec())
        };
        let candidate = UnsealedBlock::new(payload, prev_hash);
        let sealed = pow.mine_with(candidate, parallel, cancel)?;
        self.commit(sealed)
    }

    pub fn commit(&self, block: SealedBlock) -> Result<Arc<SealedBlock>> {
        let mut chain = self.write();
        chain.commit(block)?;
        Ok(Arc::clone(chain.tip_arc()))
    }

    /// The committed blocks at this instant. Only the `Arc`s are cloned; the
    /// read lock is held just long enough to copy the pointers.
    pub fn snapshot(&self) -> Vec<Arc<SealedBlock>> {
        self.read().blocks().to_vec()
    }

    pub fn tip(&self) -> Arc<SealedBlock> {
        Arc::clone(self.read().tip_arc())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn verify(&self) -> Result<()> {
        self.read().verify()
    }

    // Committed blocks are never half-written, so a poisoned lock still
    // guards a consistent chain.
    fn read(&self) -> RwLockReadGuard<'_, Blockchain> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Blockchain> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
