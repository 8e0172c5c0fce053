//! Storage module - unspent output sets and chain state management

mod shared;
mod state;
mod utxo;

pub use shared::*;
pub use state::*;
pub use utxo::*;
