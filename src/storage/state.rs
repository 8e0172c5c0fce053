//! Chain state management
//!
//! Holds a bounded window of chain nodes (block, resulting unspent output set,
//! height), follows the tallest one, and evicts nodes that fall `cut_off_age`
//! or more below it. Each node owns an independent snapshot of the unspent
//! set; snapshots are never mutated once attached.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::{UnspentOutputSet, UtxoError};
use crate::config::ChainConfig;
use crate::consensus::{apply_batch, BatchSkip, Block};
use crate::crypto::Hash;
use crate::mempool::TransactionPool;
use crate::validation::Transaction;

/// Why a block was not added. The chain is unchanged in every case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockRejection {
    #[error("Parent {0} is unknown or no longer retained")]
    UnknownParent(Hash),
    #[error("Height {height} is too far below max height {max_height}")]
    BelowCutOff { height: u64, max_height: u64 },
    #[error("Block {0} is already in the chain")]
    AlreadyKnown(Hash),
    #[error("Transaction {tx} rejected: {reason}")]
    InvalidTransaction { tx: Hash, reason: BatchSkip },
    #[error("Coinbase output collides: {0}")]
    OutputCollision(UtxoError),
}

/// A block with the unspent set that results from applying it to its parent's set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainNode {
    block: Arc<Block>,
    utxo_set: Arc<UnspentOutputSet>,
    height: u64,
}

impl ChainNode {
    fn new(block: Block, utxo_set: UnspentOutputSet, height: u64) -> Self {
        Self {
            block: Arc::new(block),
            utxo_set: Arc::new(utxo_set),
            height,
        }
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn utxo_set(&self) -> &Arc<UnspentOutputSet> {
        &self.utxo_set
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn hash(&self) -> Hash {
        self.block.hash()
    }
}

/// Complete chain state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    config: ChainConfig,
    /// Retained nodes by block hash
    nodes: HashMap<Hash, ChainNode>,
    /// First-seen node of maximal height; always also present in `nodes`
    max_node: ChainNode,
    pool: TransactionPool,
}

impl ChainState {
    /// Chain holding only `genesis`, with the default configuration.
    ///
    /// Genesis is trusted: its coinbase outputs are credited without checks.
    pub fn new(genesis: Block) -> Self {
        Self::with_config(genesis, ChainConfig::default())
    }

    pub fn with_config(genesis: Block, config: ChainConfig) -> Self {
        let utxo_set = UnspentOutputSet::from_coinbase(&genesis.coinbase);
        let node = ChainNode::new(genesis, utxo_set, 0);

        let mut nodes = HashMap::new();
        nodes.insert(node.hash(), node.clone());

        info!(genesis = %node.hash().short(), cut_off_age = config.cut_off_age(), "chain initialised");
        Self {
            config,
            nodes,
            max_node: node,
            pool: TransactionPool::new(),
        }
    }

    /// Add `block` if it extends a retained node within the cutoff window and
    /// every one of its transactions is valid. Returns the new node's height.
    pub fn try_add_block(&mut self, block: &Block) -> Result<u64, BlockRejection> {
        let block_hash = block.hash();
        let result = self.connect(block, block_hash);
        if let Err(reason) = &result {
            debug!(block = %block_hash.short(), %reason, "block rejected");
        }
        result
    }

    /// Boolean form of [`ChainState::try_add_block`]
    pub fn add_block(&mut self, block: &Block) -> bool {
        self.try_add_block(block).is_ok()
    }

    fn connect(&mut self, block: &Block, block_hash: Hash) -> Result<u64, BlockRejection> {
        if self.nodes.contains_key(&block_hash) {
            return Err(BlockRejection::AlreadyKnown(block_hash));
        }

        let parent = self
            .nodes
            .get(block.prev_hash())
            .ok_or(BlockRejection::UnknownParent(*block.prev_hash()))?;

        let height = parent.height + 1;
        let max_height = self.max_height();
        if height <= self.cut_off_floor() {
            return Err(BlockRejection::BelowCutOff { height, max_height });
        }

        // Everything below works on a private copy; nothing is published until it all passes
        let outcome = apply_batch(&block.transactions, parent.utxo_set.as_ref().clone());
        if let Some((tx, reason)) = outcome.rejected.into_iter().next() {
            return Err(BlockRejection::InvalidTransaction { tx, reason });
        }

        let mut utxo_set = outcome.utxo_set;
        for (outpoint, output) in block.coinbase.created_outputs() {
            utxo_set
                .add(outpoint, output.clone())
                .map_err(BlockRejection::OutputCollision)?;
        }

        let node = ChainNode::new(block.clone(), utxo_set, height);
        self.nodes.insert(block_hash, node.clone());

        for tx in &block.transactions {
            self.pool.remove(&tx.hash());
        }

        info!(
            block = %block_hash.short(),
            height,
            transactions = block.transactions.len(),
            "block connected"
        );

        // Ties keep the first-seen node
        if height > max_height {
            self.max_node = node;
            info!(tip = %block_hash.short(), height, "new max height");
            self.evict_stale();
        }

        Ok(height)
    }

    /// Heights at or below this value may neither be added nor retained
    fn cut_off_floor(&self) -> u64 {
        self.max_height().saturating_sub(self.config.cut_off_age())
    }

    /// Drop every node at or below the cutoff floor, on any branch
    fn evict_stale(&mut self) {
        let Some(floor) = self.max_height().checked_sub(self.config.cut_off_age()) else {
            return;
        };
        let before = self.nodes.len();
        self.nodes.retain(|_, node| node.height > floor);
        let evicted = before - self.nodes.len();
        if evicted > 0 {
            debug!(evicted, floor, retained = self.nodes.len(), "evicted stale nodes");
        }
    }

    /// Queue a transaction for a future block. No validation happens here.
    ///
    /// A transaction with a pooled id replaces the pooled copy in place.
    /// Returns false only if the identical transaction is already queued.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        self.pool.add(tx)
    }

    pub fn max_height(&self) -> u64 {
        self.max_node.height
    }

    pub fn max_height_node(&self) -> &ChainNode {
        &self.max_node
    }

    pub fn max_height_block(&self) -> &Block {
        &self.max_node.block
    }

    /// The unspent set to build the next block on
    pub fn max_height_utxo_set(&self) -> &UnspentOutputSet {
        &self.max_node.utxo_set
    }

    pub fn pending_transactions(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn node(&self, hash: &Hash) -> Option<&ChainNode> {
        self.nodes.get(hash)
    }

    pub fn height_of(&self, hash: &Hash) -> Option<u64> {
        self.nodes.get(hash).map(|node| node.height)
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ChainNode> {
        self.nodes.values()
    }

    pub fn retained_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            max_height: self.max_height(),
            tip_hash: self.max_node.hash(),
            retained_nodes: self.nodes.len(),
            utxo_count: self.max_node.utxo_set.len(),
            pending_transactions: self.pool.len(),
        }
    }
}

/// Statistics about the chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub max_height: u64,
    pub tip_hash: Hash,
    pub retained_nodes: usize,
    pub utxo_count: usize,
    pub pending_transactions: usize,
}
