//! Native JSON-RPC client for Substrate node endpoints.
//!
//! Implements [`ChainRpc`](super::ChainRpc) over JSON-RPC using `reqwest`,
//! with optional request rate limiting, an LRU header cache, and a broadcast
//! channel that reports transport errors to an observer.

mod client;
mod connection;
mod parsing;
mod protocol;

pub use client::HttpRpcClient;
