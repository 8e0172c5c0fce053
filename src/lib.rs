//! UTXO ledger kernel
//!
//! Keeps a bounded window of competing chain extensions, picks the tallest one,
//! and validates each block's transactions against its parent's unspent
//! output set. Block production, networking and persistence live elsewhere.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod mempool;
pub mod node;
pub mod storage;
pub mod validation;

pub use config::{ChainConfig, ConfigError};
pub use storage::{BlockRejection, ChainState, SharedChainState};

/// Protocol constants
pub mod constants {
    /// Blocks whose height would be at or below `max_height - CUT_OFF_AGE` are
    /// rejected, and nodes at or below that height are evicted.
    pub const CUT_OFF_AGE: u64 = 10;

    /// Version written into new transactions
    pub const TX_VERSION: u32 = 1;

    /// Version written into new block headers
    pub const BLOCK_VERSION: u32 = 1;
}
