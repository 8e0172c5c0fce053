//! Block structure
//!
//! A block names its parent, carries one coinbase and an ordered list of
//! ordinary transactions. Its identifier is the hash of the header.

use serde::{Deserialize, Serialize};

use crate::constants::BLOCK_VERSION;
use crate::crypto::{compute_merkle_root, hash_bytes, Hash};
use crate::validation::Transaction;

/// Block header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    /// Identifier of the parent block
    pub prev_hash: Hash,
    /// Merkle root over the coinbase id followed by every transaction id
    pub merkle_root: Hash,
    /// Seconds since Unix epoch, as claimed by the producer
    pub timestamp: u64,
    /// Producer-chosen value; lets otherwise identical blocks differ
    pub nonce: u64,
}

impl BlockHeader {
    pub fn new(prev_hash: Hash, merkle_root: Hash, timestamp: u64, nonce: u64) -> Self {
        Self {
            version: BLOCK_VERSION,
            prev_hash,
            merkle_root,
            timestamp,
            nonce,
        }
    }

    /// Serialize the header for hashing
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(84);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.prev_hash.0);
        bytes.extend_from_slice(&self.merkle_root.0);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn hash(&self) -> Hash {
        hash_bytes(&self.to_bytes())
    }
}

/// A complete block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    /// The only value-creating transaction; has no inputs
    pub coinbase: Transaction,
    /// Ordinary transactions, applied in this order
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block on top of `prev_hash`, computing the merkle root
    pub fn new(
        prev_hash: Hash,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Self {
        let merkle_root = Self::merkle_root_of(&coinbase, &transactions);
        Self {
            header: BlockHeader::new(prev_hash, merkle_root, timestamp, 0),
            coinbase,
            transactions,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.header.nonce = nonce;
        self
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn prev_hash(&self) -> &Hash {
        &self.header.prev_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash == Hash::zero()
    }

    /// Whether the header's merkle root matches the body
    pub fn has_valid_merkle_root(&self) -> bool {
        Self::merkle_root_of(&self.coinbase, &self.transactions) == self.header.merkle_root
    }

    /// Ids of the ordinary transactions, in block order
    pub fn transaction_ids(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    fn merkle_root_of(coinbase: &Transaction, transactions: &[Transaction]) -> Hash {
        let leaves: Vec<Hash> = std::iter::once(coinbase)
            .chain(transactions)
            .map(Transaction::hash)
            .collect();
        compute_merkle_root(&leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    fn coinbase(seed: u8) -> Transaction {
        Transaction::coinbase(25, PrivateKey::from_bytes(&[seed; 32]).unwrap().public_key())
    }

    #[test]
    fn test_block_header_serialization() {
        let header = BlockHeader::new(Hash::zero(), Hash::zero(), 1234567890, 0);
        assert_eq!(header.to_bytes().len(), 4 + 32 + 32 + 8 + 8);
    }

    #[test]
    fn test_genesis_block_detection() {
        let genesis = Block::new(Hash::zero(), coinbase(1), vec![], 0);
        assert!(genesis.is_genesis());

        let child = Block::new(genesis.hash(), coinbase(2), vec![], 1);
        assert!(!child.is_genesis());
        assert_eq!(*child.prev_hash(), genesis.hash());
    }

    #[test]
    fn test_merkle_root_covers_coinbase() {
        let a = Block::new(Hash::zero(), coinbase(1), vec![], 0);
        let b = Block::new(Hash::zero(), coinbase(2), vec![], 0);
        assert!(a.has_valid_merkle_root());
        assert_ne!(a.header.merkle_root, b.header.merkle_root);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_tampered_body_detected() {
        let mut block = Block::new(Hash::zero(), coinbase(1), vec![], 0);
        block.transactions.push(coinbase(3));
        assert!(!block.has_valid_merkle_root());
    }

    #[test]
    fn test_repeated_trailing_transaction_changes_id() {
        let empty = Transaction::new(vec![], vec![]);
        let short = Block::new(Hash::zero(), coinbase(1), vec![coinbase(2), empty.clone()], 0);
        let long = Block::new(Hash::zero(), coinbase(1), vec![coinbase(2), empty.clone(), empty], 0);

        assert_ne!(short.header.merkle_root, long.header.merkle_root);
        assert_ne!(short.hash(), long.hash());

        // A header cannot be reused with the padded body
        let mut padded = short.clone();
        padded.transactions = long.transactions.clone();
        assert!(!padded.has_valid_merkle_root());
    }

    #[test]
    fn test_transaction_ids_in_block_order() {
        let block = Block::new(Hash::zero(), coinbase(1), vec![coinbase(3), coinbase(2)], 0);
        assert_eq!(block.transaction_ids(), vec![coinbase(3).hash(), coinbase(2).hash()]);
        assert!(!block.transaction_ids().contains(&block.coinbase.hash()));
    }

    #[test]
    fn test_nonce_changes_id() {
        let block = Block::new(Hash::zero(), coinbase(1), vec![], 0);
        assert_ne!(block.hash(), block.clone().with_nonce(1).hash());
    }
}
