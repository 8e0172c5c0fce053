//! Batch application of candidate transactions
//!
//! Candidates are processed once, in the order given; the first valid spender
//! of an output wins. This is a greedy pass, not a search for the largest
//! acceptable subset, so reordering the same candidates can change the result.

use thiserror::Error;
use tracing::debug;

use super::validation::{validate_transaction, TxValidationError};
use crate::crypto::Hash;
use crate::storage::{UnspentOutputSet, UtxoError};
use crate::validation::Transaction;

/// Why a candidate was left out of a batch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchSkip {
    #[error(transparent)]
    Invalid(#[from] TxValidationError),
    #[error("Would recreate a live output: {0}")]
    OutputCollision(UtxoError),
}

/// Result of applying a batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Accepted transactions, in processing order
    pub accepted: Vec<Transaction>,
    /// Skipped candidates with the reason each was skipped
    pub rejected: Vec<(Hash, BatchSkip)>,
    /// The base set with every accepted transaction applied
    pub utxo_set: UnspentOutputSet,
}

impl BatchOutcome {
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Apply `candidates` to `base`, keeping every transaction that is valid at its turn.
///
/// Outputs of accepted transactions become spendable by later candidates.
/// Invalid candidates are skipped; they never affect the working set.
pub fn apply_batch(candidates: &[Transaction], base: UnspentOutputSet) -> BatchOutcome {
    let mut working = base;
    let mut pending = UnspentOutputSet::new();
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();

    for tx in candidates {
        let tx_hash = tx.hash();

        if let Err(reason) = validate_transaction(tx, &working, &pending) {
            debug!(tx = %tx_hash.short(), %reason, "skipping batch candidate");
            rejected.push((tx_hash, reason.into()));
            continue;
        }

        if let Err(collision) = working.apply_transaction(tx) {
            debug!(tx = %tx_hash.short(), %collision, "skipping batch candidate");
            rejected.push((tx_hash, BatchSkip::OutputCollision(collision)));
            continue;
        }

        // Spent pending outputs must not stay spendable for later candidates
        for input in &tx.inputs {
            pending.remove(&input.prev_out);
        }
        for (outpoint, output) in tx.created_outputs() {
            // Cannot collide: the same outpoint was just inserted into `working`
            let _ = pending.add(outpoint, output.clone());
        }

        accepted.push(tx.clone());
    }

    BatchOutcome {
        accepted,
        rejected,
        utxo_set: working,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::validation::{OutPoint, TxInput, TxOutput};

    fn key(seed: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[seed; 32]).unwrap()
    }

    fn transfer(prev: OutPoint, signer: &PrivateKey, value: i64, to: u8) -> Transaction {
        let mut tx = Transaction::new(
            vec![TxInput::unsigned(prev)],
            vec![TxOutput::new(value, key(to).public_key())],
        );
        tx.sign_input(0, signer).unwrap();
        tx
    }

    fn base() -> (UnspentOutputSet, OutPoint) {
        let coinbase = Transaction::coinbase(25, key(1).public_key());
        (UnspentOutputSet::from_coinbase(&coinbase), coinbase.outpoint(0))
    }

    #[test]
    fn test_chained_spend_in_order() {
        let (set, prev) = base();
        let tx1 = transfer(prev, &key(1), 25, 2);
        let tx2 = transfer(tx1.outpoint(0), &key(2), 25, 3);

        let outcome = apply_batch(&[tx1.clone(), tx2.clone()], set);

        assert!(outcome.all_accepted());
        assert_eq!(outcome.accepted, vec![tx1.clone(), tx2.clone()]);
        assert!(!outcome.utxo_set.contains(&prev));
        assert!(!outcome.utxo_set.contains(&tx1.outpoint(0)));
        assert!(outcome.utxo_set.contains(&tx2.outpoint(0)));
    }

    #[test]
    fn test_chained_spend_reversed_is_order_dependent() {
        let (set, prev) = base();
        let tx1 = transfer(prev, &key(1), 25, 2);
        let tx2 = transfer(tx1.outpoint(0), &key(2), 25, 3);

        let outcome = apply_batch(&[tx2.clone(), tx1.clone()], set);

        assert_eq!(outcome.accepted, vec![tx1.clone()]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, tx2.hash());
        assert!(outcome.utxo_set.contains(&tx1.outpoint(0)));
    }

    #[test]
    fn test_conflicting_spends_first_wins() {
        let (set, prev) = base();
        let to_two = transfer(prev, &key(1), 25, 2);
        let to_three = transfer(prev, &key(1), 25, 3);

        let outcome = apply_batch(&[to_two.clone(), to_three.clone()], set);

        assert_eq!(outcome.accepted, vec![to_two]);
        assert!(matches!(
            outcome.rejected[0].1,
            BatchSkip::Invalid(TxValidationError::MissingReferencedOutput { .. })
        ));
    }

    #[test]
    fn test_spent_pending_output_not_reusable() {
        let (set, prev) = base();
        let tx1 = transfer(prev, &key(1), 25, 2);
        let tx2 = transfer(tx1.outpoint(0), &key(2), 25, 3);
        let tx3 = transfer(tx1.outpoint(0), &key(2), 25, 4);

        let outcome = apply_batch(&[tx1, tx2, tx3.clone()], set);

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.rejected[0].0, tx3.hash());
    }

    #[test]
    fn test_rejected_outputs_do_not_leak() {
        let (set, prev) = base();
        // Invalid: creates value
        let greedy = transfer(prev, &key(1), 30, 2);
        let child = transfer(greedy.outpoint(0), &key(2), 30, 3);

        let outcome = apply_batch(&[greedy, child], set.clone());

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.utxo_set, set);
    }

    #[test]
    fn test_output_collision_skipped() {
        let (set, _) = base();
        // Zero-input, zero-value transaction is valid but can only be created once
        let empty = Transaction::new(vec![], vec![TxOutput::new(0, key(2).public_key())]);

        let outcome = apply_batch(&[empty.clone(), empty.clone()], set);

        assert_eq!(outcome.accepted.len(), 1);
        assert!(matches!(outcome.rejected[0].1, BatchSkip::OutputCollision(_)));
    }

    #[test]
    fn test_empty_batch() {
        let (set, _) = base();
        let outcome = apply_batch(&[], set.clone());
        assert!(outcome.accepted.is_empty());
        assert!(outcome.all_accepted());
        assert_eq!(outcome.utxo_set, set);
    }
}
