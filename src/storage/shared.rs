//! Thread-safe chain handle
//!
//! Writers (`add_block`, `add_transaction`) are serialized by the write lock.
//! Readers hold the read lock only while cloning an `Arc` to an immutable
//! snapshot, so what they get back stays consistent after the lock is released.

use parking_lot::RwLock;
use std::sync::Arc;

use super::{BlockRejection, ChainState, ChainStats, UnspentOutputSet};
use crate::consensus::Block;
use crate::validation::Transaction;

#[derive(Debug, Clone)]
pub struct SharedChainState {
    inner: Arc<RwLock<ChainState>>,
}

impl SharedChainState {
    pub fn new(state: ChainState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn try_add_block(&self, block: &Block) -> Result<u64, BlockRejection> {
        self.inner.write().try_add_block(block)
    }

    pub fn add_block(&self, block: &Block) -> bool {
        self.inner.write().add_block(block)
    }

    pub fn add_transaction(&self, tx: Transaction) -> bool {
        self.inner.write().add_transaction(tx)
    }

    pub fn max_height(&self) -> u64 {
        self.inner.read().max_height()
    }

    pub fn max_height_block(&self) -> Arc<Block> {
        Arc::clone(self.inner.read().max_height_node().block())
    }

    pub fn max_height_utxo_set(&self) -> Arc<UnspentOutputSet> {
        Arc::clone(self.inner.read().max_height_node().utxo_set())
    }

    /// Tip block and its unspent set, read under one lock so they always match
    pub fn mining_template(&self) -> (Arc<Block>, Arc<UnspentOutputSet>) {
        let state = self.inner.read();
        let node = state.max_height_node();
        (Arc::clone(node.block()), Arc::clone(node.utxo_set()))
    }

    /// Pending transactions in submission order
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.inner.read().pending_transactions().transactions()
    }

    pub fn stats(&self) -> ChainStats {
        self.inner.read().stats()
    }

    /// Run `f` against the state under the read lock
    pub fn with_state<R>(&self, f: impl FnOnce(&ChainState) -> R) -> R {
        f(&self.inner.read())
    }
}
