//! Request DTOs for the gateway API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Key read by GET /get and purged by DELETE /delete when none is given.
pub const DEFAULT_KEY: &str = "message";

/// Value written by POST /set when the request carries no body.
pub const DEFAULT_VALUE: &str = "Hello World!";

/// Request body for POST /set
///
/// The entries to write are wrapped in a `body` field:
/// `{"body": {"app_1": "one", "app_2": "two"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetRequest {
    /// Entries to write; `None` selects the default entry
    #[serde(default)]
    pub body: Option<Map<String, Value>>,
}

impl SetRequest {
    /// Parses a raw request body. An empty body is the same as `{}`.
    pub fn from_slice(raw: &[u8]) -> Result<Self, GatewayError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(raw).map_err(|e| GatewayError::InvalidBody(e.to_string()))
    }

    /// Flattens the request into `(key, value)` pairs in request order.
    ///
    /// Strings are kept verbatim; any other JSON value is stored as its
    /// compact JSON text.
    pub fn into_entries(self) -> Vec<(String, String)> {
        match self.body {
            Some(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect(),
            None => vec![(DEFAULT_KEY.to_string(), DEFAULT_VALUE.to_string())],
        }
    }
}

/// Query string for GET /get
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchQuery {
    pub key: Option<String>,
}

impl FetchQuery {
    pub fn key(self) -> String {
        self.key.unwrap_or_else(|| DEFAULT_KEY.to_string())
    }
}

/// Query string for DELETE /delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurgeQuery {
    /// Glob pattern such as `app_*`
    pub pattern: Option<String>,
}

impl PurgeQuery {
    pub fn pattern(self) -> String {
        self.pattern.unwrap_or_else(|| DEFAULT_KEY.to_string())
    }
}
