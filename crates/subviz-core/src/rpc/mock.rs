use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parity_scale_codec::Encode;
use tokio::sync::broadcast;

use crate::error::CoreError;
use crate::types::{BlockHash, BlockHeight, Header};

use super::storage::StorageKey;
use super::types::SystemInfo;
use super::ChainRpc;

/// A mock node for testing. Serves canned storage values from a `HashMap`
/// populated via the builder pattern, and records every storage key read so
/// tests can assert which query path was taken.
pub struct MockRpc {
    info: SystemInfo,
    best: BlockHash,
    hashes: HashMap<BlockHeight, BlockHash>,
    headers: HashMap<BlockHash, Header>,
    storage: HashMap<StorageKey, Vec<u8>>,
    reads: Mutex<Vec<StorageKey>>,
    errors: broadcast::Sender<String>,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        let best = BlockHash([0xbb; 32]);
        let mut headers = HashMap::new();
        headers.insert(
            best,
            Header {
                number: BlockHeight(1_000),
            },
        );
        let mut hashes = HashMap::new();
        hashes.insert(BlockHeight(1_000), best);

        MockRpcBuilder {
            info: SystemInfo {
                chain: "Development".into(),
                node_name: "mock-node".into(),
                node_version: "1.0.0".into(),
            },
            best,
            hashes,
            headers,
            storage: HashMap::new(),
        }
    }

    /// Hash of the mock's best block.
    pub fn best_hash(&self) -> BlockHash {
        self.best
    }

    /// Storage keys read so far, in call order.
    pub fn reads(&self) -> Vec<StorageKey> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Whether any read touched the storage item `pallet.item`.
    pub fn read_item(&self, pallet: &str, item: &str) -> bool {
        let prefix = StorageKey::prefix(pallet, item);
        self.reads().iter().any(|key| key.starts_with(&prefix))
    }

    /// Push a transport error to observers.
    pub fn emit_transport_error(&self, message: &str) {
        let _ = self.errors.send(message.to_owned());
    }
}

pub struct MockRpcBuilder {
    info: SystemInfo,
    best: BlockHash,
    hashes: HashMap<BlockHeight, BlockHash>,
    headers: HashMap<BlockHash, Header>,
    storage: HashMap<StorageKey, Vec<u8>>,
}

impl MockRpcBuilder {
    pub fn with_chain(mut self, chain: &str) -> Self {
        self.info.chain = chain.to_owned();
        self
    }

    /// Add a block; it becomes the best block when `best` is set.
    pub fn with_block(mut self, height: u64, hash: BlockHash, best: bool) -> Self {
        self.hashes.insert(BlockHeight(height), hash);
        self.headers.insert(
            hash,
            Header {
                number: BlockHeight(height),
            },
        );
        if best {
            self.best = hash;
        }
        self
    }

    pub fn with_storage<T: Encode>(mut self, key: StorageKey, value: T) -> Self {
        self.storage.insert(key, value.encode());
        self
    }

    pub fn with_raw_storage(mut self, key: StorageKey, bytes: Vec<u8>) -> Self {
        self.storage.insert(key, bytes);
        self
    }

    pub fn build(self) -> MockRpc {
        let (errors, _) = broadcast::channel(16);
        MockRpc {
            info: self.info,
            best: self.best,
            hashes: self.hashes,
            headers: self.headers,
            storage: self.storage,
            reads: Mutex::new(Vec::new()),
            errors,
        }
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn system_chain(&self) -> Result<String, CoreError> {
        Ok(self.info.chain.clone())
    }

    async fn system_name(&self) -> Result<String, CoreError> {
        Ok(self.info.node_name.clone())
    }

    async fn system_version(&self) -> Result<String, CoreError> {
        Ok(self.info.node_version.clone())
    }

    async fn block_hash(&self, height: Option<BlockHeight>) -> Result<BlockHash, CoreError> {
        match height {
            None => Ok(self.best),
            Some(h) => self
                .hashes
                .get(&h)
                .copied()
                .ok_or_else(|| CoreError::InvalidData(format!("no block hash for height {h}"))),
        }
    }

    async fn header(&self, hash: &BlockHash) -> Result<Header, CoreError> {
        self.headers
            .get(hash)
            .cloned()
            .ok_or_else(|| CoreError::InvalidData("header not found".to_owned()))
    }

    async fn storage(
        &self,
        key: &StorageKey,
        _at: &BlockHash,
    ) -> Result<Option<Vec<u8>>, CoreError> {
        if let Ok(mut reads) = self.reads.lock() {
            reads.push(key.clone());
        }
        Ok(self.storage.get(key).cloned())
    }

    async fn storage_keys_paged(
        &self,
        prefix: &StorageKey,
        count: u32,
        _at: &BlockHash,
    ) -> Result<Vec<StorageKey>, CoreError> {
        Ok(self
            .storage
            .keys()
            .filter(|key| key.starts_with(prefix))
            .take(count as usize)
            .cloned()
            .collect())
    }

    fn transport_errors(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.errors.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::storage::Hasher;

    #[tokio::test]
    async fn system_info_joins_all_fields() {
        let rpc = MockRpc::builder().with_chain("Kusama").build();
        let info = rpc.system_info().await.unwrap();
        assert_eq!(info.chain, "Kusama");
        assert_eq!(info.node_name, "mock-node");
        assert_eq!(info.node_version, "1.0.0");
    }

    #[tokio::test]
    async fn keys_paged_filters_by_prefix() {
        let key = StorageKey::map("System", "Account", Hasher::Blake2_128Concat, &[1u8; 32]);
        let other = StorageKey::map("Balances", "Locks", Hasher::Blake2_128Concat, &[1u8; 32]);
        let rpc = MockRpc::builder()
            .with_raw_storage(key.clone(), vec![0])
            .with_raw_storage(other, vec![0])
            .build();

        let keys = rpc
            .storage_keys_paged(&StorageKey::prefix("System", "Account"), 10, &rpc.best_hash())
            .await
            .unwrap();
        assert_eq!(keys, vec![key]);
    }

    #[tokio::test]
    async fn records_storage_reads() {
        let key = StorageKey::prefix("Staking", "Bonded");
        let rpc = MockRpc::builder().build();
        let value = rpc.storage(&key, &rpc.best_hash()).await.unwrap();
        assert!(value.is_none());
        assert!(rpc.read_item("Staking", "Bonded"));
        assert!(!rpc.read_item("Staking", "Ledger"));
    }
}
