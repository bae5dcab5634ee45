use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Protocol version stamped on requests that don't carry one.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Process-local suffix that keeps ids unique when two requests share a timestamp.
static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

/// A pending Kodi JSON-RPC call (one notification task).
///
/// `jsonrpc` and `id` are normally left unset while the request sits in the
/// queue; [`JsonRpcRequest::envelope`] fills them in when it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: None,
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Build the wire envelope, defaulting the protocol version and id.
    ///
    /// The request itself is left untouched, so a retried task gets a new id
    /// on every attempt.
    pub fn envelope(&self) -> JsonRpcEnvelope<'_> {
        JsonRpcEnvelope {
            jsonrpc: match &self.jsonrpc {
                Some(v) if !v.is_empty() => Cow::Borrowed(v.as_str()),
                _ => Cow::Borrowed(JSON_RPC_VERSION),
            },
            id: match &self.id {
                Some(id) if !id.is_empty() => Cow::Borrowed(id.as_str()),
                _ => Cow::Owned(next_request_id()),
            },
            method: &self.method,
            params: self.params.as_ref(),
        }
    }
}

/// Serialized form of a request as posted to Kodi.
#[derive(Debug, Serialize)]
pub struct JsonRpcEnvelope<'a> {
    pub jsonrpc: Cow<'a, str>,
    pub id: Cow<'a, str>,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a serde_json::Value>,
}

/// Kodi's reply. Only parsed for diagnostics; delivery is judged on HTTP status.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Best-effort parse of a raw response body.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl std::fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Time-derived correlation id, e.g. `2026-10-18T09:12:44.123456789Z#17`.
fn next_request_id() -> String {
    let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}#{}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        seq
    )
}
