//! Endpoint failover and session ownership.
//!
//! [`EndpointConnection`] walks an ordered endpoint pool until one answers,
//! probes the account schema once, and hands out [`Session`] handles. There
//! is no process-wide connection: callers pass the session explicitly.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::account::{probe_schema, AccountSchema, SchemaKind};
use crate::error::{CoreError, RpcError};
use crate::rpc::{ChainRpc, HttpRpcClient};

/// Per-endpoint bound on opening a session.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1_000);

// ==============================================================================
// Connector
// ==============================================================================

/// Opens a transport to one endpoint and checks that it answers.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, CoreError>;
}

/// Opens [`HttpRpcClient`] transports, using `system_chain` as the
/// readiness handshake.
pub struct HttpConnector {
    connect_timeout: Duration,
    requests_per_second: Option<u32>,
}

impl HttpConnector {
    pub fn new(connect_timeout: Duration, requests_per_second: Option<u32>) -> Self {
        Self {
            connect_timeout,
            requests_per_second,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, CoreError> {
        let client = HttpRpcClient::new(endpoint, self.connect_timeout, self.requests_per_second)?;
        client.system_chain().await?;
        Ok(Arc::new(client))
    }
}

// ==============================================================================
// Session
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    Failed,
}

/// A live connection: the transport, the endpoint it is bound to, and the
/// account schema probed when it was opened. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    rpc: Arc<dyn ChainRpc>,
    endpoint: String,
    schema: Arc<dyn AccountSchema>,
}

impl Session {
    pub fn rpc(&self) -> Arc<dyn ChainRpc> {
        self.rpc.clone()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn schema(&self) -> Arc<dyn AccountSchema> {
        self.schema.clone()
    }

    pub fn schema_kind(&self) -> SchemaKind {
        self.schema.kind()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("schema", &self.schema.kind())
            .finish()
    }
}

// ==============================================================================
// Endpoint Connection
// ==============================================================================

pub struct EndpointConnection {
    endpoints: Vec<String>,
    current_endpoint: String,
    connector: Box<dyn Connector>,
    timeout: Duration,
    state: SessionState,
    session: Option<Session>,
    observer: Option<JoinHandle<()>>,
}

impl EndpointConnection {
    pub fn new(endpoints: Vec<String>, connector: Box<dyn Connector>, timeout: Duration) -> Self {
        Self {
            endpoints,
            current_endpoint: String::new(),
            connector,
            timeout,
            state: SessionState::Disconnected,
            session: None,
            observer: None,
        }
    }

    /// HTTP transports with the given per-endpoint timeout.
    pub fn http(endpoints: Vec<String>, timeout: Duration, requests_per_second: Option<u32>) -> Self {
        Self::new(
            endpoints,
            Box::new(HttpConnector::new(timeout, requests_per_second)),
            timeout,
        )
    }

    /// The endpoint of the live session, or empty when not connected.
    pub fn current_endpoint(&self) -> &str {
        &self.current_endpoint
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Connect to the first endpoint that answers, in declaration order.
    ///
    /// Returns the existing session when already `Ready`. Fails with
    /// `NoReachableEndpoint` once every endpoint has been tried.
    pub async fn connect(&mut self) -> Result<Session, CoreError> {
        if let (SessionState::Ready, Some(session)) = (self.state, &self.session) {
            return Ok(session.clone());
        }

        self.state = SessionState::Connecting;
        self.current_endpoint.clear();

        for endpoint in &self.endpoints {
            info!(endpoint = %endpoint, "connecting");
            match tokio::time::timeout(self.timeout, open_session(self.connector.as_ref(), endpoint))
                .await
            {
                Ok(Ok(session)) => {
                    info!(
                        endpoint = %endpoint,
                        schema = %session.schema_kind(),
                        "connected"
                    );
                    self.current_endpoint = endpoint.clone();
                    self.observer = spawn_error_observer(&session);
                    self.session = Some(session.clone());
                    self.state = SessionState::Ready;
                    return Ok(session);
                }
                Ok(Err(err)) => {
                    warn!(endpoint = %endpoint, error = %err, "endpoint unavailable");
                }
                Err(_) => {
                    let err = RpcError::Timeout(self.timeout.as_millis());
                    warn!(endpoint = %endpoint, error = %err, "endpoint unavailable");
                }
            }
        }

        self.state = SessionState::Failed;
        Err(CoreError::NoReachableEndpoint {
            tried: self.endpoints.len(),
        })
    }
}

impl Drop for EndpointConnection {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
    }
}

async fn open_session(connector: &dyn Connector, endpoint: &str) -> Result<Session, CoreError> {
    let rpc = connector.open(endpoint).await?;
    let tip = rpc.block_hash(None).await?;
    let schema = probe_schema(rpc.as_ref(), &tip).await?;
    Ok(Session {
        rpc,
        endpoint: endpoint.to_owned(),
        schema,
    })
}

/// Log transport errors for the lifetime of the session. Errors are not
/// fatal to the session and nothing reconnects.
fn spawn_error_observer(session: &Session) -> Option<JoinHandle<()>> {
    let mut errors = session.rpc.transport_errors()?;
    let endpoint = session.endpoint.clone();
    Some(tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(message) => error!(endpoint = %endpoint, error = %message, "transport error"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(endpoint = %endpoint, skipped, "transport errors dropped")
                }
                Err(RecvError::Closed) => break,
            }
        }
    }))
}
