//! Unspent output set
//!
//! In-memory map from outpoint to output. Snapshots are taken with an explicit
//! `clone()`; nothing here is copy-on-write.

use std::collections::HashMap;
use thiserror::Error;

use crate::crypto::PublicKey;
use crate::validation::{OutPoint, Transaction, TxOutput};

/// UTXO set errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UtxoError {
    #[error("Output {0} already exists")]
    Duplicate(OutPoint),
    #[error("Output {0} is not unspent")]
    Missing(OutPoint),
}

/// Set of all unspent transaction outputs at one point of the chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnspentOutputSet {
    utxos: HashMap<OutPoint, TxOutput>,
}

impl UnspentOutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding exactly the outputs of a coinbase transaction
    pub fn from_coinbase(coinbase: &Transaction) -> Self {
        let utxos = coinbase
            .created_outputs()
            .map(|(outpoint, output)| (outpoint, output.clone()))
            .collect();
        Self { utxos }
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.utxos.get(outpoint)
    }

    /// Insert a new output. Existing entries are never overwritten.
    pub fn add(&mut self, outpoint: OutPoint, output: TxOutput) -> Result<(), UtxoError> {
        if self.utxos.contains_key(&outpoint) {
            return Err(UtxoError::Duplicate(outpoint));
        }
        self.utxos.insert(outpoint, output);
        Ok(())
    }

    /// Remove an output (when spent)
    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.utxos.remove(outpoint)
    }

    /// Spend the transaction's inputs and credit its outputs.
    ///
    /// All-or-nothing: if any input is missing or any output already exists
    /// the set is left untouched. Coinbase transactions only credit.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> Result<(), UtxoError> {
        for input in &tx.inputs {
            if !self.contains(&input.prev_out) {
                return Err(UtxoError::Missing(input.prev_out));
            }
        }
        if let Some((outpoint, _)) = tx.created_outputs().find(|(o, _)| self.contains(o)) {
            return Err(UtxoError::Duplicate(outpoint));
        }

        for input in &tx.inputs {
            self.utxos.remove(&input.prev_out);
        }
        for (outpoint, output) in tx.created_outputs() {
            self.utxos.insert(outpoint, output.clone());
        }
        Ok(())
    }

    /// Iterate over every unspent output
    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.utxos.iter()
    }

    /// Outputs spendable by `owner`
    pub fn outputs_owned_by(&self, owner: &PublicKey) -> Vec<(OutPoint, &TxOutput)> {
        self.utxos
            .iter()
            .filter(|(_, output)| output.owner == *owner)
            .map(|(outpoint, output)| (*outpoint, output))
            .collect()
    }

    /// Total value spendable by `owner`
    pub fn balance_of(&self, owner: &PublicKey) -> i128 {
        self.utxos
            .values()
            .filter(|output| output.owner == *owner)
            .map(|output| output.value as i128)
            .sum()
    }

    /// Sum of every unspent value
    pub fn total_value(&self) -> i128 {
        self.utxos.values().map(|o| o.value as i128).sum()
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

impl FromIterator<(OutPoint, TxOutput)> for UnspentOutputSet {
    fn from_iter<I: IntoIterator<Item = (OutPoint, TxOutput)>>(iter: I) -> Self {
        Self {
            utxos: iter.into_iter().collect(),
        }
    }
}
