use reqwest::Url;

use crate::error::CoreError;

/// Normalize an endpoint URL to the HTTP URL the JSON-RPC client posts to.
///
/// Substrate nodes serve WebSocket and HTTP JSON-RPC on the same port, so
/// `ws://` and `wss://` endpoints map onto `http://` and `https://`.
pub(super) fn parse_connection(connection: &str) -> Result<String, CoreError> {
    let mut parsed = Url::parse(connection).map_err(|e| {
        CoreError::InvalidData(format!(
            "invalid endpoint `{connection}`: expected HTTP(S) or WS(S) URL ({e})"
        ))
    })?;
    let mapped = match parsed.scheme() {
        "http" | "https" => return Ok(connection.to_owned()),
        "ws" => "http",
        "wss" => "https",
        other => {
            return Err(CoreError::InvalidData(format!(
                "unsupported endpoint scheme `{other}`; expected http, https, ws or wss"
            )))
        }
    };
    parsed.set_scheme(mapped).map_err(|()| {
        CoreError::InvalidData(format!("cannot map endpoint `{connection}` to {mapped}"))
    })?;
    Ok(parsed.to_string())
}
