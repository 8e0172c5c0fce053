//! Mempool module - transactions waiting for a block

mod pool;

pub use pool::*;
