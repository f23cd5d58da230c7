use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat, serializable form of a [`Request`](super::Request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub dont_filter: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestRecord {
    /// Encodes the record as JSON bytes
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes a record from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
