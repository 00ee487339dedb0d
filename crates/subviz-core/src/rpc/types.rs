//! RPC-specific types that do not belong to the shared domain model.

use serde::Deserialize;

// ==============================================================================
// System Info
// ==============================================================================

/// Chain and node identification from the `system_*` RPC methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub chain: String,
    pub node_name: String,
    pub node_version: String,
}

/// Header as returned by `chain_getHeader`. Numbers are hex strings.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawHeader {
    pub number: String,
}
