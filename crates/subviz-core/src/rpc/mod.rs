//! Substrate node RPC abstraction layer.
//!
//! Defines the [`ChainRpc`] trait and provides an HTTP JSON-RPC
//! implementation ([`HttpRpcClient`]) plus a test mock (`mock::MockRpc`).

mod http_adapter;
#[cfg(test)]
pub mod mock;
pub mod storage;
pub mod types;

pub use http_adapter::HttpRpcClient;
pub use storage::{Hasher, StorageKey};
pub use types::SystemInfo;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::CoreError;
use crate::types::{BlockHash, BlockHeight, Header};

/// Minimal trait covering the node RPC methods the pipeline needs.
///
/// Storage values are returned as raw SCALE bytes; decoding belongs to the
/// account schemas, which know the runtime generation they are talking to.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Chain name as reported by `system_chain`, e.g. `Kusama`.
    async fn system_chain(&self) -> Result<String, CoreError>;

    async fn system_name(&self) -> Result<String, CoreError>;

    async fn system_version(&self) -> Result<String, CoreError>;

    /// Hash of the block at `height`, or of the best block when `None`.
    async fn block_hash(&self, height: Option<BlockHeight>) -> Result<BlockHash, CoreError>;

    async fn header(&self, hash: &BlockHash) -> Result<Header, CoreError>;

    /// Raw storage value at `key`. `None` when nothing is stored there.
    async fn storage(&self, key: &StorageKey, at: &BlockHash)
        -> Result<Option<Vec<u8>>, CoreError>;

    /// Up to `count` storage keys that start with `prefix`.
    async fn storage_keys_paged(
        &self,
        prefix: &StorageKey,
        count: u32,
        at: &BlockHash,
    ) -> Result<Vec<StorageKey>, CoreError>;

    /// Stream of transport-level errors seen after the session was opened.
    /// Implementations without a long-lived transport return `None`.
    fn transport_errors(&self) -> Option<broadcast::Receiver<String>> {
        None
    }

    /// Chain and node identification, fetched concurrently.
    async fn system_info(&self) -> Result<SystemInfo, CoreError> {
        let (chain, node_name, node_version) = futures::try_join!(
            self.system_chain(),
            self.system_name(),
            self.system_version()
        )?;
        Ok(SystemInfo {
            chain,
            node_name,
            node_version,
        })
    }
}
