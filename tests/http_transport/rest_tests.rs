//! REST driver behaviour and a gateway wired to a REST server.

use super::canned_server::{CannedResponse, CannedServer, RecordedRequest};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolplex::gateway::{GatewayStack, ToolCallOutcome};
use toolplex::protocol::RpcEnvelope;
use toolplex::session::adapters::ScriptedProcessLauncher;
use toolplex::settings::Settings;
use toolplex::tool_registry::domain::{
    CallerId, RestTransportConfig, ToolServerConfig, ToolServerHealthStatus, ToolServerId,
    ToolTransport,
};
use toolplex::transport::{FailureKind, TransportError};
use toolplex::transport::adapters::{DEFAULT_BODY_EXCERPT_CHARS, RestDriver, build_http_client};
use toolplex::transport::ports::TransportDriver;

fn driver() -> RestDriver {
    RestDriver::new(
        build_http_client(Duration::from_secs(5)).expect("http client"),
        DEFAULT_BODY_EXCERPT_CHARS,
    )
}

fn rest_server(config: RestTransportConfig) -> ToolServerConfig {
    ToolServerConfig::new(
        ToolServerId::new("search").expect("valid id"),
        "Search",
        ToolTransport::Rest(config),
    )
    .expect("valid server config")
}

fn base_config(server: &CannedServer) -> RestTransportConfig {
    RestTransportConfig::new(server.url("/api/")).expect("valid base url")
}

/// Routes by path: discovery, health and invocation.
fn vendor_api(request: &RecordedRequest) -> CannedResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/tools") => CannedResponse::json(&json!({
            "tools": [{ "name": "search", "inputSchema": { "type": "object" } }]
        })),
        ("GET", "/api/health") => CannedResponse::json(&json!({ "status": "ok" })),
        ("GET", "/api/down") => CannedResponse::text(503, "maintenance"),
        ("POST", "/api/invoke") => match request.body.pointer("/arguments/q").and_then(Value::as_str) {
            Some("quota") => CannedResponse::json(&json!({ "error": "quota exhausted" })),
            Some("plain") => CannedResponse::text(200, "plain answer"),
            Some("html") => CannedResponse::html("<html><body>Bad gateway</body></html>"),
            _ => CannedResponse::json(&json!({ "data": { "hits": 2 } })),
        },
        _ => CannedResponse::text(404, "no route"),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_call_posts_name_and_arguments_and_unwraps_data() {
    let server = CannedServer::start(vendor_api).await;
    let config = base_config(&server)
        .with_headers([("Authorization".to_owned(), "Bearer secret".to_owned())])
        .expect("valid headers");
    let envelope = RpcEnvelope::tools_call("search", json!({ "q": "rust" }));
    let request_id = envelope.id();

    let response = driver()
        .send(&rest_server(config), envelope)
        .await
        .expect("invoke should be answered");

    assert!(response.answers(request_id));
    assert_eq!(response.into_result(), Ok(json!({ "hits": 2 })));
    let requests = server.requests();
    let recorded = requests.first().expect("request recorded");
    assert_eq!(recorded.path, "/api/invoke");
    assert_eq!(
        recorded.body,
        json!({ "name": "search", "arguments": { "q": "rust" } })
    );
    assert_eq!(recorded.header("authorization"), Some("Bearer secret"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn vendor_error_bodies_become_error_outcomes() {
    let server = CannedServer::start(vendor_api).await;

    let response = driver()
        .send(
            &rest_server(base_config(&server)),
            RpcEnvelope::tools_call("search", json!({ "q": "quota" })),
        )
        .await
        .expect("invoke should be answered");

    let error = response.into_result().expect_err("error outcome");
    assert_eq!(error.code, -32000);
    assert_eq!(error.message, "quota exhausted");
}

#[rstest]
#[case::plain_text("plain")]
#[case::html_page("html")]
#[tokio::test(flavor = "multi_thread")]
async fn non_json_success_bodies_are_malformed(#[case] query: &str) {
    let server = CannedServer::start(vendor_api).await;

    let outcome = driver()
        .send(
            &rest_server(base_config(&server)),
            RpcEnvelope::tools_call("search", json!({ "q": query })),
        )
        .await;

    let err = outcome.expect_err("a non-JSON body must not become a result");
    assert!(matches!(err, TransportError::MalformedBody { .. }), "got {err:?}");
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn discovery_uses_the_discovery_path() {
    let server = CannedServer::start(vendor_api).await;
    let config = base_config(&server)
        .with_discovery_path("/tools")
        .expect("valid path");

    let response = driver()
        .send(&rest_server(config), RpcEnvelope::tools_list())
        .await
        .expect("discovery should be answered");

    let result = response.into_result().expect("success outcome");
    assert_eq!(result.pointer("/tools/0/name"), Some(&json!("search")));
    let requests = server.requests();
    let recorded = requests.first().expect("request recorded");
    assert_eq!((recorded.method.as_str(), recorded.path.as_str()), ("GET", "/api/tools"));
}

#[rstest]
#[case::healthy(Some("/health"), Some(true))]
#[case::failing(Some("/down"), Some(false))]
#[case::no_probe(None, None)]
#[tokio::test(flavor = "multi_thread")]
async fn probe_uses_the_health_path(#[case] path: Option<&str>, #[case] expected: Option<bool>) {
    let server = CannedServer::start(vendor_api).await;
    let mut config = base_config(&server);
    if let Some(health) = path {
        config = config.with_health_path(health).expect("valid path");
    }

    let outcome = driver().probe(&rest_server(config)).await;

    assert_eq!(outcome.as_ref().map(Result::is_ok), expected);
    if let Some(Err(err)) = outcome {
        assert!(matches!(err, TransportError::Status { status: 503, .. }), "got {err:?}");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn gateway_routes_rest_servers_end_to_end() {
    let server = CannedServer::start(vendor_api).await;
    let settings = Settings::from_toml_str(&format!(
        r#"
        [[servers]]
        id = "search"
        [servers.transport]
        kind = "rest"
        base_url = "{}"
        discovery_path = "/tools"
        health_path = "/health"
        "#,
        server.url("/api")
    ))
    .expect("settings should parse");
    let stack = GatewayStack::assemble(
        &settings,
        Arc::new(ScriptedProcessLauncher::failing()),
        Arc::new(DefaultClock),
    )
    .expect("stack should assemble");
    let gateway = stack.gateway();
    let search = ToolServerId::new("search").expect("valid id");

    let tools = gateway.list_tools(&search).await.expect("discovery");
    assert_eq!(tools.len(), 1);

    let health = gateway.health(&search).await.expect("health");
    assert_eq!(health.status(), ToolServerHealthStatus::Healthy);

    let outcome = gateway
        .call_tool(
            &CallerId::new("tester").expect("valid caller"),
            &search,
            "search",
            json!({ "q": "rust" }),
        )
        .await
        .expect("call should be delivered");
    let ToolCallOutcome::Completed(response) = outcome else {
        panic!("expected an inline response, got {outcome:?}");
    };
    assert_eq!(response.into_result(), Ok(json!({ "hits": 2 })));

    stack.shutdown().await;
}
