//! JSON-RPC 2.0 envelopes, responses and incoming message classification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Tool protocol version announced in the `initialize` handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC internal error code, used when a peer omits one.
const INTERNAL_ERROR_CODE: i64 = -32603;

/// Method names understood by the multiplexer.
pub mod methods {
    /// Handshake request sent first on every new session.
    pub const INITIALIZE: &str = "initialize";
    /// Notification sent after a successful handshake.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Tool discovery.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique request identifier.
///
/// Identifiers come from a monotonic counter and are never reused, so a
/// retry always carries a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Mints the next identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns whether a wire `id` value refers to this request.
    ///
    /// Peers that echo ids as strings are tolerated.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match value {
            Value::Number(number) => number.as_u64() == Some(self.0),
            Value::String(text) => text.trim().parse::<u64>().ok() == Some(self.0),
            _ => false,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<RequestId> for Value {
    fn from(value: RequestId) -> Self {
        Self::from(value.0)
    }
}

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcEnvelope {
    jsonrpc: &'static str,
    id: RequestId,
    method: String,
    params: Value,
}

impl RpcEnvelope {
    /// Builds a request with a freshly minted id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: RequestId::next(),
            method: method.into(),
            params,
        }
    }

    /// Builds the `initialize` handshake request.
    #[must_use]
    pub fn initialize(client_name: &str, client_version: &str) -> Self {
        Self::new(
            methods::INITIALIZE,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": client_name, "version": client_version },
            }),
        )
    }

    /// Builds a `tools/list` request.
    #[must_use]
    pub fn tools_list() -> Self {
        Self::new(methods::TOOLS_LIST, Value::Object(Map::new()))
    }

    /// Builds a `tools/call` request.
    #[must_use]
    pub fn tools_call(name: &str, arguments: Value) -> Self {
        Self::new(
            methods::TOOLS_CALL,
            json!({ "name": name, "arguments": arguments }),
        )
    }

    /// Returns the request id.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request parameters.
    #[must_use]
    pub const fn params(&self) -> &Value {
        &self.params
    }

    /// Serializes the request as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `params` cannot be encoded.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Outgoing JSON-RPC notification (no id, no response).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcNotification {
    jsonrpc: &'static str,
    method: String,
    params: Value,
}

impl RpcNotification {
    /// Builds a notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Builds the post-handshake `notifications/initialized` message.
    #[must_use]
    pub fn initialized() -> Self {
        Self::new(methods::INITIALIZED, Value::Object(Map::new()))
    }

    /// Serializes the notification as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `params` cannot be encoded.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Error object carried by a JSON-RPC error response.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("remote error {code}: {message}")]
pub struct RpcErrorObject {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Creates an error object without detail.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Reads an error value leniently.
    ///
    /// Missing codes become the internal error code; a bare string becomes
    /// the message; any other shape is kept as `data`.
    #[must_use]
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::String(message) => Self::new(INTERNAL_ERROR_CODE, message.clone()),
            Value::Object(fields) => Self {
                code: fields
                    .get("code")
                    .and_then(Value::as_i64)
                    .unwrap_or(INTERNAL_ERROR_CODE),
                message: fields
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| value.to_string(), str::to_owned),
                data: fields.get("data").cloned(),
            },
            other => Self {
                code: INTERNAL_ERROR_CODE,
                message: other.to_string(),
                data: Some(other.clone()),
            },
        }
    }
}

/// Exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// Successful result payload.
    Result(Value),
    /// Error payload.
    Error(RpcErrorObject),
}

/// Response correlated to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    id: Value,
    outcome: RpcOutcome,
}

impl RpcResponse {
    /// Creates a response for a request id.
    #[must_use]
    pub fn new(id: RequestId, outcome: RpcOutcome) -> Self {
        Self {
            id: id.into(),
            outcome,
        }
    }

    /// Creates a successful response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, RpcOutcome::Result(result))
    }

    /// Creates an error response.
    #[must_use]
    pub fn failure(id: RequestId, error: RpcErrorObject) -> Self {
        Self::new(id, RpcOutcome::Error(error))
    }

    /// Returns the raw wire id.
    #[must_use]
    pub const fn id(&self) -> &Value {
        &self.id
    }

    /// Returns whether this response answers `id`.
    #[must_use]
    pub fn answers(&self, id: RequestId) -> bool {
        id.matches(&self.id)
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn outcome(&self) -> &RpcOutcome {
        &self.outcome
    }

    /// Returns whether the outcome is an error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.outcome, RpcOutcome::Error(_))
    }

    /// Converts the outcome into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the remote [`RpcErrorObject`] for error outcomes.
    pub fn into_result(self) -> Result<Value, RpcErrorObject> {
        match self.outcome {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Error(error) => Err(error),
        }
    }

    /// Renders the response as a JSON-RPC document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match &self.outcome {
            RpcOutcome::Result(result) => {
                json!({ "jsonrpc": JSONRPC_VERSION, "id": self.id, "result": result })
            }
            RpcOutcome::Error(error) => {
                json!({ "jsonrpc": JSONRPC_VERSION, "id": self.id, "error": error })
            }
        }
    }

    /// Returns the text scanned for lock-contention signatures: the
    /// serialized result, or the error message and data.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        match &self.outcome {
            RpcOutcome::Result(result) => result.to_string(),
            RpcOutcome::Error(error) => match &error.data {
                Some(data) => format!("{} {data}", error.message),
                None => error.message.clone(),
            },
        }
    }
}

/// Classification of a JSON message read from a tool server.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// A response with an id and a result or error.
    Response(RpcResponse),
    /// A notification from the server.
    Notification {
        /// Notification method.
        method: String,
    },
    /// A request initiated by the server.
    ServerRequest {
        /// Server-chosen id.
        id: Value,
        /// Requested method.
        method: String,
    },
    /// Valid JSON that is not a recognizable JSON-RPC message.
    Unrecognized(Value),
}

impl IncomingMessage {
    /// Classifies a decoded JSON value.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Unrecognized(value);
        };

        let method = fields
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let id = fields.get("id").filter(|id| !id.is_null()).cloned();

        match (method, id) {
            (Some(method), Some(id)) => Self::ServerRequest { id, method },
            (Some(method), None) => Self::Notification { method },
            (None, Some(id)) => {
                if let Some(error) = fields.get("error").filter(|error| !error.is_null()) {
                    let outcome = RpcOutcome::Error(RpcErrorObject::from_wire(error));
                    Self::Response(RpcResponse { id, outcome })
                } else if let Some(result) = fields.remove("result") {
                    Self::Response(RpcResponse {
                        id,
                        outcome: RpcOutcome::Result(result),
                    })
                } else {
                    Self::Unrecognized(Value::Object(fields))
                }
            }
            (None, None) => Self::Unrecognized(Value::Object(fields)),
        }
    }
}
