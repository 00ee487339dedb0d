pub mod account;
pub mod address;
pub mod amount;
pub mod connection;
pub mod error;
pub mod export;
pub mod graph;
pub mod labels;
pub mod ledger;
pub mod rpc;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::CoreError;
pub use types::{TransferGraph, FINALITY_DEPTH};
