//! Transaction validation
//!
//! Pure functions checking one transaction against the confirmed unspent set
//! plus the outputs created earlier in the same uncommitted batch. Nothing here
//! mutates either set; registering outputs of an accepted transaction is the
//! caller's job.

use std::collections::HashSet;
use thiserror::Error;

use crate::storage::UnspentOutputSet;
use crate::validation::{Amount, OutPoint, Transaction, TxOutput};

/// Why a transaction is invalid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxValidationError {
    #[error("Input {input} references unknown output {outpoint}")]
    MissingReferencedOutput { input: usize, outpoint: OutPoint },
    #[error("Output {0} is claimed more than once")]
    DuplicateClaimWithinTransaction(OutPoint),
    #[error("Output {output} has negative value {value}")]
    NegativeOutputValue { output: usize, value: Amount },
    #[error("Signature on input {input} does not verify")]
    SignatureVerificationFailed { input: usize },
    #[error("Inputs total {inputs} but outputs total {outputs}")]
    InputValueLessThanOutputValue { inputs: i128, outputs: i128 },
}

/// Look an outpoint up in the confirmed set, then in the pending outputs.
///
/// One lookup per outpoint: a value is never counted from both sets.
fn resolve<'a>(
    outpoint: &OutPoint,
    confirmed: &'a UnspentOutputSet,
    pending: &'a UnspentOutputSet,
) -> Option<&'a TxOutput> {
    confirmed.get(outpoint).or_else(|| pending.get(outpoint))
}

/// Validate `tx` against `confirmed` and the batch's `pending` outputs.
///
/// Checks, in order:
/// 1. every input's output exists in `confirmed` or `pending`
/// 2. no output is claimed twice by this transaction
/// 3. no output value is negative
/// 4. every input is signed by the owner of the output it spends
/// 5. input total >= output total (the difference is an implicit fee)
pub fn validate_transaction(
    tx: &Transaction,
    confirmed: &UnspentOutputSet,
    pending: &UnspentOutputSet,
) -> Result<(), TxValidationError> {
    let mut spent = Vec::with_capacity(tx.inputs.len());
    for (index, input) in tx.inputs.iter().enumerate() {
        let output = resolve(&input.prev_out, confirmed, pending).ok_or(
            TxValidationError::MissingReferencedOutput {
                input: index,
                outpoint: input.prev_out,
            },
        )?;
        spent.push(output);
    }

    let mut claimed = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !claimed.insert(input.prev_out) {
            return Err(TxValidationError::DuplicateClaimWithinTransaction(
                input.prev_out,
            ));
        }
    }

    if let Some((index, output)) = tx.outputs.iter().enumerate().find(|(_, o)| o.value < 0) {
        return Err(TxValidationError::NegativeOutputValue {
            output: index,
            value: output.value,
        });
    }

    for (index, (input, output)) in tx.inputs.iter().zip(&spent).enumerate() {
        let verified = tx
            .signing_payload(index)
            .is_some_and(|payload| output.owner.verify(&payload, &input.signature));
        if !verified {
            return Err(TxValidationError::SignatureVerificationFailed { input: index });
        }
    }

    let inputs: i128 = spent.iter().map(|o| o.value as i128).sum();
    let outputs = tx.total_output_value();
    if inputs < outputs {
        return Err(TxValidationError::InputValueLessThanOutputValue { inputs, outputs });
    }

    Ok(())
}

/// Boolean form of [`validate_transaction`]
pub fn is_valid_transaction(
    tx: &Transaction,
    confirmed: &UnspentOutputSet,
    pending: &UnspentOutputSet,
) -> bool {
    validate_transaction(tx, confirmed, pending).is_ok()
}
