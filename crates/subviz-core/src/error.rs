use crate::types::BlockRef;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("cannot find a suitable endpoint to connect (tried {tried})")]
    NoReachableEndpoint { tried: usize },

    #[error("account not found: {address} at {at}")]
    AccountNotFound { address: String, at: BlockRef },

    #[error("corrupt chain state: {0}")]
    CorruptChainState(String),

    #[error("unit scale must be non-zero")]
    InvalidUnitScale,

    #[error("RPC communication failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("invalid address `{address}`: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid chain data: {0}")]
    InvalidData(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    #[error("export error: {0}")]
    Export(#[from] csv::Error),

    #[error("label parse error at line {line}: {message}")]
    LabelParse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("connection attempt timed out after {0} ms")]
    Timeout(u128),
}
