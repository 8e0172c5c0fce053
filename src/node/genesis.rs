//! Genesis block construction
//!
//! Genesis has the zero hash as parent and a coinbase paying the initial
//! allocations. It is trusted as-is when a chain is created from it.

use crate::consensus::Block;
use crate::crypto::{Hash, PublicKey};
use crate::validation::{Amount, Transaction, TxOutput};

/// Build a genesis block paying each `(owner, value)` allocation, in order.
///
/// The same inputs always produce the same block.
pub fn create_genesis_block(allocations: &[(PublicKey, Amount)], timestamp: u64) -> Block {
    let outputs = allocations
        .iter()
        .map(|(owner, value)| TxOutput::new(*value, *owner))
        .collect();
    let coinbase = Transaction::coinbase_with_outputs(outputs);

    Block::new(Hash::zero(), coinbase, Vec::new(), timestamp)
}

/// Whether `block` is exactly the genesis identified by `expected_hash`
pub fn verify_genesis_hash(block: &Block, expected_hash: &Hash) -> bool {
    block.is_genesis() && block.hash() == *expected_hash
}
