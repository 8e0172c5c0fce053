//! Transaction structure
//!
//! UTXO-based transactions: every input spends one previously created output
//! and carries a Schnorr signature from that output's owner.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::TX_VERSION;
use crate::crypto::{hash_bytes, Hash, PrivateKey, PublicKey, SchnorrSignature, SignatureError};

/// Value carried by an output. Signed so that negative amounts are representable and rejected.
pub type Amount = i64;

/// Identifies one output: the creating transaction and the output's position in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Id of the transaction that created the output
    pub tx_hash: Hash,
    /// Index of the output in that transaction
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash.short(), self.index)
    }
}

/// A transaction input referencing a previous output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The output being spent
    pub prev_out: OutPoint,
    /// Signature by the spent output's owner over this input's signing payload
    pub signature: SchnorrSignature,
}

impl TxInput {
    /// An input with an empty signature, to be filled by [`Transaction::sign_input`]
    pub fn unsigned(prev_out: OutPoint) -> Self {
        Self {
            prev_out,
            signature: SchnorrSignature::empty(),
        }
    }
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: Amount,
    /// Key whose signature is required to spend this output
    pub owner: PublicKey,
}

impl TxOutput {
    pub fn new(value: Amount, owner: PublicKey) -> Self {
        Self { value, owner }
    }
}

/// A complete transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Free-form field; also lets otherwise identical transactions get distinct ids
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Single-output coinbase paying `value` to `owner`
    pub fn coinbase(value: Amount, owner: PublicKey) -> Self {
        Self::coinbase_with_outputs(vec![TxOutput::new(value, owner)])
    }

    /// Coinbase with arbitrary outputs and no inputs
    pub fn coinbase_with_outputs(outputs: Vec<TxOutput>) -> Self {
        Self::new(Vec::new(), outputs)
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Coinbase transactions create value and spend nothing
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Content-addressed identifier. Signatures are excluded, so signing does not change the id.
    pub fn hash(&self) -> Hash {
        let mut bytes = Vec::with_capacity(16 + self.inputs.len() * 36 + self.outputs.len() * 40);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            write_outpoint(&mut bytes, &input.prev_out);
        }
        self.write_outputs(&mut bytes);
        bytes.extend_from_slice(&self.lock_time.to_le_bytes());
        hash_bytes(&bytes)
    }

    /// Payload the owner of the output spent by input `index` must sign.
    ///
    /// Commits to the spent outpoint, the input position and every output.
    pub fn signing_payload(&self, index: usize) -> Option<Hash> {
        let input = self.inputs.get(index)?;

        let mut bytes = Vec::with_capacity(48 + self.outputs.len() * 40);
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&(index as u32).to_le_bytes());
        write_outpoint(&mut bytes, &input.prev_out);
        self.write_outputs(&mut bytes);
        bytes.extend_from_slice(&self.lock_time.to_le_bytes());
        Some(hash_bytes(&bytes))
    }

    /// Sign input `index` with `key`
    pub fn sign_input(&mut self, index: usize, key: &PrivateKey) -> Result<(), SignatureError> {
        let payload = self
            .signing_payload(index)
            .ok_or(SignatureError::NoSuchInput(index))?;
        self.inputs[index].signature = key.sign(&payload);
        Ok(())
    }

    /// Outpoint naming this transaction's output `index`
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint::new(self.hash(), index)
    }

    /// Outpoints and outputs this transaction creates, in order
    pub fn created_outputs(&self) -> impl Iterator<Item = (OutPoint, &TxOutput)> {
        let tx_hash = self.hash();
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, output)| (OutPoint::new(tx_hash, index as u32), output))
    }

    /// Sum of output values, widened so it cannot overflow
    pub fn total_output_value(&self) -> i128 {
        self.outputs.iter().map(|o| o.value as i128).sum()
    }

    fn write_outputs(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            bytes.extend_from_slice(&output.value.to_le_bytes());
            bytes.extend_from_slice(&output.owner.0);
        }
    }
}

fn write_outpoint(bytes: &mut Vec<u8>, outpoint: &OutPoint) {
    bytes.extend_from_slice(&outpoint.tx_hash.0);
    bytes.extend_from_slice(&outpoint.index.to_le_bytes());
}
