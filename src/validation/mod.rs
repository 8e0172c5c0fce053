//! Transaction data model - inputs, outputs, identifiers and signing payloads

mod transaction;

pub use transaction::*;
