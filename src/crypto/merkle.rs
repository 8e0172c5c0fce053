//! Merkle root over transaction identifiers
//!
//! Commits a block header to its coinbase and transaction list.

use super::{hash_bytes, hash_pair, Hash};

/// Compute the merkle root of `leaves`.
///
/// An empty list yields the zero hash. An odd level pairs its last node with
/// itself, and the leaf count is hashed into the result so that `[a, b, c]`
/// and `[a, b, c, c]` commit to different roots.
pub fn compute_merkle_root(leaves: &[Hash]) -> Hash {
    let mut level: Vec<Hash> = leaves.to_vec();
    if level.is_empty() {
        return Hash::zero();
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                hash_pair(left, right)
            })
            .collect();
    }

    let count = hash_bytes(&(leaves.len() as u64).to_le_bytes());
    hash_pair(&count, &level[0])
}
