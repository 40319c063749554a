//! Normalization of vendor REST response bodies into JSON-RPC responses.

use super::{IncomingMessage, RequestId, RpcErrorObject, RpcOutcome, RpcResponse};
use serde_json::Value;

/// Error code attached to vendor `{ "error": ... }` bodies.
const VENDOR_ERROR_CODE: i64 = -32000;

/// Keys that carry the result in common vendor shapes, in priority order.
const RESULT_KEYS: [&str; 3] = ["result", "data", "output"];

/// Converts a REST response body into a response for `id`.
///
/// JSON-RPC shaped bodies are taken as they are. Otherwise an `error` key
/// becomes an error outcome, the first of `result`, `data` or `output`
/// becomes the result, and any other body is the result verbatim.
#[must_use]
pub fn normalize_rest_body(body: Value, id: RequestId) -> RpcResponse {
    if is_json_rpc_shaped(&body)
        && let IncomingMessage::Response(response) = IncomingMessage::classify(body.clone())
    {
        return response;
    }

    let Value::Object(mut fields) = body else {
        return RpcResponse::success(id, body);
    };

    if let Some(error) = fields.get("error").filter(|error| !error.is_null()) {
        let mut error_object = RpcErrorObject::from_wire(error);
        if !error.get("code").is_some_and(Value::is_i64) {
            error_object.code = VENDOR_ERROR_CODE;
        }
        return RpcResponse::new(id, RpcOutcome::Error(error_object));
    }

    for key in RESULT_KEYS {
        if let Some(result) = fields.remove(key) {
            return RpcResponse::success(id, result);
        }
    }

    RpcResponse::success(id, Value::Object(fields))
}

fn is_json_rpc_shaped(body: &Value) -> bool {
    body.get("jsonrpc").is_some()
        || (body.get("id").is_some() && (body.get("result").is_some() || body.get("error").is_some()))
}
