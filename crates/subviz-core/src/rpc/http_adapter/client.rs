use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use lru::LruCache;
use reqwest::header;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};
use crate::types::{BlockHash, BlockHeight, Header};

use super::super::storage::StorageKey;
use super::super::ChainRpc;
use super::connection::parse_connection;
use super::parsing::{
    parse_block_hash, parse_header, parse_storage_keys, parse_storage_value, parse_string,
};
use super::protocol::{parse_jsonrpc_error, JsonRpcRequest, JsonRpcResponse};

/// Maximum number of block-hash → header entries cached in memory.
const HEADER_CACHE_CAP: usize = 1_024;

/// Capacity of the transport error channel. Lagging observers skip entries.
const ERROR_CHANNEL_CAP: usize = 64;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Substrate JSON-RPC client over HTTP(S).
///
/// Headers of hashed blocks never change, so they are kept in a bounded LRU
/// cache. Every transport failure is also published on a broadcast channel
/// so a session observer can log it.
pub struct HttpRpcClient {
    client: reqwest::Client,
    url: String,
    limiter: Option<DirectRateLimiter>,
    next_id: AtomicU64,
    header_cache: Mutex<LruCache<BlockHash, Header>>,
    errors: broadcast::Sender<String>,
}

impl HttpRpcClient {
    /// Create a new client for an endpoint URL.
    ///
    /// `connection` accepts `http(s)://` URLs and `ws(s)://` URLs, the
    /// latter mapped to the HTTP listener on the same port.
    /// `connect_timeout` bounds TCP/TLS setup for every request.
    /// If `requests_per_second` is set, outbound calls are rate-limited.
    pub fn new(
        connection: &str,
        connect_timeout: Duration,
        requests_per_second: Option<u32>,
    ) -> Result<Self, CoreError> {
        let url = parse_connection(connection)?;

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(RpcError::Transport)?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidData("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAP);

        Ok(Self {
            client,
            url,
            limiter,
            next_id: AtomicU64::new(initial_request_id()),
            header_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(HEADER_CACHE_CAP).unwrap_or(NonZeroUsize::MIN),
            )),
            errors,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Report a transport failure to observers. Nobody listening is fine.
    fn publish_error(&self, method: &str, err: &RpcError) {
        let _ = self.errors.send(format!("{method}: {err}"));
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, CoreError> {
        self.wait_for_rate_limit().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            rpc.id = id,
            rpc.method = method,
            rpc.params = params.len(),
            "rpc call"
        );
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                let err = RpcError::Transport(e);
                self.publish_error(method, &err);
                err
            })?;
        let status = response.status();

        let body = response.text().await.map_err(|e| {
            let err = RpcError::Transport(e);
            self.publish_error(method, &err);
            err
        })?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "rpc response body");

        let decoded: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            RpcError::InvalidResponse(format!(
                "decode JSON-RPC response ({status}): {e}; body={body}"
            ))
        })?;

        if let Some(err) = decoded.error {
            return Err(parse_jsonrpc_error(err));
        }

        Ok(decoded.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ChainRpc for HttpRpcClient {
    async fn system_chain(&self) -> Result<String, CoreError> {
        let raw = self.rpc_call("system_chain", Vec::new()).await?;
        parse_string(raw, "system_chain")
    }

    async fn system_name(&self) -> Result<String, CoreError> {
        let raw = self.rpc_call("system_name", Vec::new()).await?;
        parse_string(raw, "system_name")
    }

    async fn system_version(&self) -> Result<String, CoreError> {
        let raw = self.rpc_call("system_version", Vec::new()).await?;
        parse_string(raw, "system_version")
    }

    async fn block_hash(&self, height: Option<BlockHeight>) -> Result<BlockHash, CoreError> {
        let params = match height {
            Some(h) => vec![serde_json::json!(h.0)],
            None => Vec::new(),
        };
        let raw = self.rpc_call("chain_getBlockHash", params).await?;
        if raw.is_null() {
            return Err(CoreError::InvalidData(format!(
                "no block hash for height {}",
                height.map_or_else(|| "best".to_owned(), |h| h.to_string())
            )));
        }
        parse_block_hash(raw)
    }

    async fn header(&self, hash: &BlockHash) -> Result<Header, CoreError> {
        if let Some(header) = self.header_cache.lock().await.get(hash).cloned() {
            return Ok(header);
        }

        let raw = self
            .rpc_call("chain_getHeader", vec![serde_json::json!(hash.to_hex())])
            .await?;
        let header = parse_header(raw)?;
        self.header_cache.lock().await.put(*hash, header.clone());
        Ok(header)
    }

    async fn storage(
        &self,
        key: &StorageKey,
        at: &BlockHash,
    ) -> Result<Option<Vec<u8>>, CoreError> {
        let raw = self
            .rpc_call(
                "state_getStorage",
                vec![
                    serde_json::json!(key.to_hex()),
                    serde_json::json!(at.to_hex()),
                ],
            )
            .await?;
        parse_storage_value(raw)
    }

    async fn storage_keys_paged(
        &self,
        prefix: &StorageKey,
        count: u32,
        at: &BlockHash,
    ) -> Result<Vec<StorageKey>, CoreError> {
        let raw = self
            .rpc_call(
                "state_getKeysPaged",
                vec![
                    serde_json::json!(prefix.to_hex()),
                    serde_json::json!(count),
                    serde_json::Value::Null,
                    serde_json::json!(at.to_hex()),
                ],
            )
            .await?;
        parse_storage_keys(raw)
    }

    fn transport_errors(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.errors.subscribe())
    }
}

fn initial_request_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}
