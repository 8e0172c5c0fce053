//! Node bootstrap helpers

mod genesis;

pub use genesis::*;
