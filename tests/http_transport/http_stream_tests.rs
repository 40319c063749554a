//! HTTP stream driver behaviour: handshake, session ids, JSON and SSE bodies.

use super::canned_server::{CannedResponse, CannedServer, RecordedRequest, unreachable_url};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use toolplex::protocol::RpcEnvelope;
use toolplex::tool_registry::domain::{ToolServerConfig, ToolServerId, ToolTransport};
use toolplex::transport::adapters::{DEFAULT_BODY_EXCERPT_CHARS, HttpStreamDriver, build_http_client};
use toolplex::transport::ports::TransportDriver;
use toolplex::transport::{FailureKind, TransportError};

const SESSION_HEADER: &str = "mcp-session-id";

fn server_config(url: &str) -> ToolServerConfig {
    ToolServerConfig::new(
        ToolServerId::new("remote").expect("valid id"),
        "Remote",
        ToolTransport::http_stream(url).expect("valid url"),
    )
    .expect("valid server config")
}

fn driver(timeout: Duration, excerpt: usize) -> HttpStreamDriver {
    HttpStreamDriver::new(build_http_client(timeout).expect("http client"), excerpt)
        .with_client_info("toolplex-tests", "0.0.1")
}

fn default_driver() -> HttpStreamDriver {
    driver(Duration::from_secs(5), DEFAULT_BODY_EXCERPT_CHARS)
}

fn result_for(request: &RecordedRequest, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": request.body["id"], "result": result })
}

fn tool_list() -> Value {
    json!({ "tools": [{ "name": "search", "inputSchema": { "type": "object" } }] })
}

/// Answers the handshake with a session id, accepts notifications and
/// replies to everything else with `reply`.
fn stateful_server(
    reply: impl Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static,
) -> impl Fn(&RecordedRequest) -> CannedResponse + Send + Sync + 'static {
    move |request| match request.rpc_method() {
        Some("initialize") => CannedResponse::json(&result_for(
            request,
            json!({ "protocolVersion": "2024-11-05", "capabilities": {} }),
        ))
        .with_header(SESSION_HEADER, "session-1"),
        Some("notifications/initialized") => CannedResponse::accepted(),
        _ => reply(request),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn json_response_after_handshake_echoes_session_id() {
    let server = CannedServer::start(stateful_server(|request| {
        CannedResponse::json(&result_for(request, tool_list()))
    }))
    .await;
    let driver = default_driver();
    let config = server_config(&server.url("/mcp"));

    let response = driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("tools/list should be answered");
    driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("second request reuses the session");

    assert_eq!(response.into_result(), Ok(tool_list()));
    assert_eq!(
        server.rpc_methods(),
        vec!["initialize", "notifications/initialized", "tools/list", "tools/list"]
    );
    let requests = server.requests();
    let first = requests.first().expect("handshake recorded");
    assert_eq!(first.header(SESSION_HEADER), None);
    assert_eq!(
        first.body.pointer("/params/clientInfo/name"),
        Some(&json!("toolplex-tests"))
    );
    for later in requests.iter().skip(1) {
        assert_eq!(later.header(SESSION_HEADER), Some("session-1"));
        assert_eq!(later.path, "/mcp");
        assert!(
            later
                .header("accept")
                .is_some_and(|accept| accept.contains("text/event-stream"))
        );
    }
    assert_eq!(
        driver.session_id(config.id()),
        Some("session-1".to_owned())
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn event_stream_body_yields_the_matching_response() {
    let server = CannedServer::start(stateful_server(|request| {
        CannedResponse::sse(&[
            json!({ "jsonrpc": "2.0", "method": "notifications/progress", "params": { "progress": 1 } }),
            result_for(request, json!({ "content": [{ "type": "text", "text": "found" }] })),
        ])
    }))
    .await;
    let driver = default_driver();
    let config = server_config(&server.url("/mcp"));

    let response = driver
        .send(&config, RpcEnvelope::tools_call("search", json!({ "q": "rust" })))
        .await
        .expect("tools/call should be answered");

    let result = response.into_result().expect("success outcome");
    assert_eq!(result.pointer("/content/0/text"), Some(&json!("found")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn error_status_carries_a_truncated_body() {
    let server = CannedServer::start(stateful_server(|_| {
        CannedResponse::text(502, &"x".repeat(500))
    }))
    .await;
    let driver = driver(Duration::from_secs(5), 64);
    let config = server_config(&server.url("/mcp"));

    let outcome = driver.send(&config, RpcEnvelope::tools_list()).await;

    let Err(TransportError::Status { status, body, .. }) = &outcome else {
        panic!("expected a status error, got {outcome:?}");
    };
    assert_eq!(*status, 502);
    assert_eq!(body.chars().count(), 64);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_session_repeats_the_handshake() {
    let expired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&expired);
    let server = CannedServer::start(stateful_server(move |request| {
        if flag.swap(false, Ordering::SeqCst) {
            CannedResponse::text(404, "unknown session")
        } else {
            CannedResponse::json(&result_for(request, tool_list()))
        }
    }))
    .await;
    let driver = default_driver();
    let config = server_config(&server.url("/mcp"));

    driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("first request succeeds");
    expired.store(true, Ordering::SeqCst);
    let lost = driver.send(&config, RpcEnvelope::tools_list()).await;
    assert!(matches!(lost, Err(TransportError::Status { status: 404, .. })));
    assert_eq!(driver.session_id(config.id()), None);

    driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("request after re-handshake succeeds");

    let initializations = server
        .rpc_methods()
        .iter()
        .filter(|method| method.as_str() == "initialize")
        .count();
    assert_eq!(initializations, 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn servers_without_initialize_are_still_usable() {
    let server = CannedServer::start(|request: &RecordedRequest| match request.rpc_method() {
        Some("initialize") => CannedResponse::json(&json!({
            "jsonrpc": "2.0",
            "id": request.body["id"],
            "error": { "code": -32601, "message": "method not found" }
        })),
        _ => CannedResponse::json(&result_for(request, tool_list())),
    })
    .await;
    let driver = default_driver();
    let config = server_config(&server.url("/rpc"));

    let response = driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("tools/list should be answered");

    assert_eq!(response.into_result(), Ok(tool_list()));
    assert_eq!(server.rpc_methods(), vec!["initialize", "tools/list"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_server_times_out() {
    let server = CannedServer::start(|request: &RecordedRequest| {
        CannedResponse::json(&result_for(request, json!({}))).delayed(Duration::from_millis(800))
    })
    .await;
    let driver = driver(Duration::from_millis(100), DEFAULT_BODY_EXCERPT_CHARS);

    let outcome = driver
        .send(&server_config(&server.url("/mcp")), RpcEnvelope::tools_list())
        .await;

    let err = outcome.expect_err("request should time out");
    assert_eq!(err.kind(), FailureKind::Timeout);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_a_transport_failure() {
    let driver = default_driver();

    let outcome = driver
        .send(&server_config(&unreachable_url().await), RpcEnvelope::tools_list())
        .await;

    let err = outcome.expect_err("connection should fail");
    assert!(matches!(err, TransportError::Http { .. }), "got {err:?}");
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forget_drops_the_session() {
    let server = CannedServer::start(stateful_server(|request| {
        CannedResponse::json(&result_for(request, tool_list()))
    }))
    .await;
    let driver = default_driver();
    let config = server_config(&server.url("/mcp"));

    driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("first request succeeds");
    driver.forget(config.id()).await;

    assert_eq!(driver.session_id(config.id()), None);
    driver
        .send(&config, RpcEnvelope::tools_list())
        .await
        .expect("request after forget succeeds");
    assert_eq!(
        server.rpc_methods(),
        vec![
            "initialize",
            "notifications/initialized",
            "tools/list",
            "initialize",
            "notifications/initialized",
            "tools/list"
        ]
    );
}
