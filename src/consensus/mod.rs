//! Consensus module - Block structure, transaction validation and batch application

mod batch;
mod block;
mod validation;

pub use batch::*;
pub use block::*;
pub use validation::*;
