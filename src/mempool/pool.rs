//! Pending transaction pool
//!
//! Staging area for submitted transactions that no accepted block has
//! confirmed yet. Nothing is validated on the way in; validity is decided when
//! a block carrying the transaction is added. Entries never expire here.
//!
//! Submission order is preserved because block assembly applies transactions
//! greedily in order.

use std::collections::{BTreeMap, HashMap};

use crate::crypto::Hash;
use crate::validation::Transaction;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPool {
    /// tx hash -> (arrival sequence, transaction)
    entries: HashMap<Hash, (u64, Transaction)>,
    /// arrival sequence -> tx hash
    order: BTreeMap<u64, Hash>,
    next_seq: u64,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tx`, replacing any pooled transaction with the same id.
    ///
    /// Ids leave signatures out, so a replacement keeps the earlier arrival
    /// position but carries the newest signatures. Returns false only if an
    /// identical transaction was already pooled.
    pub fn add(&mut self, tx: Transaction) -> bool {
        let tx_hash = tx.hash();
        if let Some((_, pooled)) = self.entries.get_mut(&tx_hash) {
            if *pooled == tx {
                return false;
            }
            *pooled = tx;
            return true;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, tx_hash);
        self.entries.insert(tx_hash, (seq, tx));
        true
    }

    pub fn remove(&mut self, tx_hash: &Hash) -> Option<Transaction> {
        let (seq, tx) = self.entries.remove(tx_hash)?;
        self.order.remove(&seq);
        Some(tx)
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.entries.get(tx_hash).map(|(_, tx)| tx)
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.entries.contains_key(tx_hash)
    }

    /// Pooled transactions in submission order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.order
            .values()
            .filter_map(|tx_hash| self.get(tx_hash))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
