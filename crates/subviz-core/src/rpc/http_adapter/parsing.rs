use crate::error::CoreError;
use crate::rpc::storage::StorageKey;
use crate::rpc::types::RawHeader;
use crate::types::{BlockHash, BlockHeight, Header};

pub(super) fn parse_string(raw: serde_json::Value, method: &str) -> Result<String, CoreError> {
    match raw {
        serde_json::Value::String(s) => Ok(s),
        other => Err(CoreError::InvalidData(format!(
            "invalid {method} result: expected string, got {other}"
        ))),
    }
}

pub(super) fn parse_block_hash(raw: serde_json::Value) -> Result<BlockHash, CoreError> {
    let s = raw
        .as_str()
        .ok_or_else(|| CoreError::InvalidData(format!("missing block hash, got {raw}")))?;
    s.parse()
}

pub(super) fn parse_header(raw: serde_json::Value) -> Result<Header, CoreError> {
    if raw.is_null() {
        return Err(CoreError::InvalidData("header not found".to_owned()));
    }
    let header: RawHeader = serde_json::from_value(raw)
        .map_err(|e| CoreError::InvalidData(format!("invalid chain_getHeader result: {e}")))?;
    Ok(Header {
        number: BlockHeight(parse_hex_number(&header.number)?),
    })
}

/// Parse a `0x`-prefixed hex quantity such as a header `number`.
pub(super) fn parse_hex_number(s: &str) -> Result<u64, CoreError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| CoreError::InvalidData(format!("invalid hex number `{s}`: {e}")))
}

pub(super) fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, CoreError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| CoreError::InvalidData(format!("invalid hex `{s}`: {e}")))
}

/// `state_getStorage` returns `null` for an empty slot.
pub(super) fn parse_storage_value(raw: serde_json::Value) -> Result<Option<Vec<u8>>, CoreError> {
    match raw {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => parse_hex_bytes(&s).map(Some),
        other => Err(CoreError::InvalidData(format!(
            "invalid state_getStorage result: {other}"
        ))),
    }
}

pub(super) fn parse_storage_keys(raw: serde_json::Value) -> Result<Vec<StorageKey>, CoreError> {
    let items = raw.as_array().ok_or_else(|| {
        CoreError::InvalidData(format!("invalid state_getKeysPaged result: {raw}"))
    })?;
    items
        .iter()
        .map(|item| {
            let s = item.as_str().ok_or_else(|| {
                CoreError::InvalidData(format!("invalid storage key in result: {item}"))
            })?;
            parse_hex_bytes(s).map(StorageKey)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_number_is_hex() {
        let raw = serde_json::json!({
            "parentHash": format!("0x{}", "ab".repeat(32)),
            "number": "0x1a2b",
            "stateRoot": "0x00",
            "extrinsicsRoot": "0x00",
            "digest": { "logs": [] }
        });
        let header = parse_header(raw).expect("header must parse");
        assert_eq!(header.number, BlockHeight(0x1a2b));
    }

    #[test]
    fn null_header_is_an_error() {
        let err = parse_header(serde_json::Value::Null).expect_err("null header must fail");
        assert!(err.to_string().contains("header not found"));
    }

    #[test]
    fn storage_null_is_none() {
        assert_eq!(parse_storage_value(serde_json::Value::Null).unwrap(), None);
        assert_eq!(
            parse_storage_value(serde_json::json!("0x0102")).unwrap(),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn storage_keys_decode() {
        let keys = parse_storage_keys(serde_json::json!(["0x01", "0x0203"])).unwrap();
        assert_eq!(keys, vec![StorageKey(vec![1]), StorageKey(vec![2, 3])]);
    }

    #[test]
    fn non_string_is_rejected() {
        let err = parse_string(serde_json::json!(5), "system_chain").expect_err("must fail");
        assert!(err.to_string().contains("system_chain"));
    }
}
