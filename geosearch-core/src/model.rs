use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provenance label attached to every successful lookup.
pub const SOURCE_LABEL: &str = "OS Data Hub – Ordnance Survey";

/// A resolved location query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub location: String,
}

/// Successful lookup payload. Field order is the wire order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationResult {
    pub location: String,
    pub source: String,
    /// Upstream JSON, passed through untouched.
    pub data: Value,
}

impl LocationResult {
    pub fn new(location: String, data: Value) -> Self {
        Self {
            location,
            source: SOURCE_LABEL.to_string(),
            data,
        }
    }
}

/// Error payload returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
