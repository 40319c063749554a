//! Shared fixtures for the in-memory integration tests.

use rstest::fixture;
use serde_json::{Value, json};
use std::time::Duration;
use toolplex::protocol::PROTOCOL_VERSION;
use toolplex::session::adapters::ScriptStep;
use toolplex::session::domain::SessionSettings;
use toolplex::tool_registry::domain::{ProcessTransportConfig, ToolServerId};

/// Session settings with short deadlines and no settle pause.
#[fixture]
pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        call_timeout: Duration::from_millis(300),
        handshake_timeout: Duration::from_millis(300),
        termination_grace: Duration::from_millis(200),
        settle_delay: Duration::ZERO,
        ..SessionSettings::default()
    }
}

/// Identity used by single-server tests.
#[fixture]
pub fn server_id() -> ToolServerId {
    ToolServerId::new("scripted").expect("valid server id")
}

/// Process configuration; the scripted launcher ignores the command.
#[fixture]
pub fn process_config() -> ProcessTransportConfig {
    ProcessTransportConfig::new("scripted-server").expect("valid process config")
}

/// Returns the request's method, or an empty string.
pub fn method_of(request: &Value) -> &str {
    request.get("method").and_then(Value::as_str).unwrap_or_default()
}

/// Answers `initialize` and ignores notifications; everything else goes to
/// `rest`.
pub fn with_handshake(
    rest: impl Fn(&Value) -> Vec<ScriptStep> + Send + Sync + 'static,
) -> impl Fn(&Value) -> Vec<ScriptStep> + Send + Sync + 'static {
    move |request| {
        if request.get("id").is_none() {
            return Vec::new();
        }
        if method_of(request) == "initialize" {
            return vec![ScriptStep::result(
                request,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "scripted", "version": "0.1.0"}
                }),
            )];
        }
        rest(request)
    }
}

/// Returns the `tools/call` argument `key` as a string.
pub fn argument<'a>(request: &'a Value, key: &str) -> &'a str {
    request
        .pointer(&format!("/params/arguments/{key}"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}
