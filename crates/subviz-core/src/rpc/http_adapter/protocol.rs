use crate::error::{CoreError, RpcError};

#[derive(serde::Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    pub(super) jsonrpc: &'static str,
    pub(super) id: u64,
    pub(super) method: &'a str,
    pub(super) params: Vec<serde_json::Value>,
}

#[derive(serde::Deserialize)]
pub(super) struct JsonRpcResponse {
    pub(super) result: Option<serde_json::Value>,
    pub(super) error: Option<serde_json::Value>,
}

/// Parse a JSON-RPC error value into a structured `CoreError`.
///
/// Well-formed errors are `{"code": <int>, "message": <string>}` and become
/// `ServerError`; anything else falls back to `InvalidResponse`.
pub(super) fn parse_jsonrpc_error(err: serde_json::Value) -> CoreError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    if let Ok(parsed) = serde_json::from_value::<JsonRpcError>(err.clone()) {
        CoreError::Rpc(RpcError::ServerError {
            code: parsed.code,
            message: parsed.message,
        })
    } else {
        CoreError::Rpc(RpcError::InvalidResponse(format!(
            "non-standard JSON-RPC error: {err}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_error_becomes_server_error() {
        let err = parse_jsonrpc_error(serde_json::json!({
            "code": -32601,
            "message": "Method not found"
        }));
        assert!(matches!(
            err,
            CoreError::Rpc(RpcError::ServerError { code: -32601, .. })
        ));
    }

    #[test]
    fn odd_error_becomes_invalid_response() {
        let err = parse_jsonrpc_error(serde_json::json!("boom"));
        assert!(matches!(err, CoreError::Rpc(RpcError::InvalidResponse(_))));
    }
}
