//! Automation sessions reset themselves when a response reports lock
//! contention; standard sessions never do.

use super::helpers::{argument, fast_settings, server_id, with_handshake};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use toolplex::protocol::RpcEnvelope;
use toolplex::session::adapters::{ScriptStep, ScriptedProcessLauncher, TranscriptEntry};
use toolplex::session::domain::{SessionError, SessionSettings};
use toolplex::session::services::{LockSignatures, SessionRegistry};
use toolplex::tool_registry::domain::{
    ProcessSessionMode, ProcessTransportConfig, ToolServerConfig, ToolServerId, ToolTransport,
};
use toolplex::transport::TransportError;
use toolplex::transport::adapters::ProcessDriver;
use toolplex::transport::ports::TransportDriver;

/// Browser-like server that reports a held profile for `url = "locked"`.
fn browser_server() -> ScriptedProcessLauncher {
    ScriptedProcessLauncher::new(with_handshake(|request| {
        let text = if argument(request, "url") == "locked" {
            "Error: browser is already in use for /tmp/profile"
        } else {
            "navigated"
        };
        vec![ScriptStep::result(
            request,
            json!({ "content": [{ "type": "text", "text": text }] }),
        )]
    }))
}

fn browser_config(server_id: ToolServerId, mode: ProcessSessionMode) -> ToolServerConfig {
    let transport = ProcessTransportConfig::new("browser-server")
        .expect("valid process config")
        .with_session_mode(mode);
    ToolServerConfig::new(server_id, "Browser", ToolTransport::Process(transport))
        .expect("valid server config")
}

fn navigate(url: &str) -> RpcEnvelope {
    RpcEnvelope::tools_call("navigate", json!({ "url": url }))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lock_contention_resets_automation_session(
    fast_settings: SessionSettings,
    server_id: ToolServerId,
) {
    let launcher = browser_server();
    let registry = Arc::new(SessionRegistry::new(Arc::new(launcher.clone()), fast_settings));
    let driver = ProcessDriver::new(Arc::clone(&registry), LockSignatures::default());
    let server = browser_config(server_id, ProcessSessionMode::PersistentAutomation);

    driver
        .send(&server, navigate("https://example.com"))
        .await
        .expect("first navigation should succeed");
    let contended = driver
        .send(&server, navigate("locked"))
        .await
        .expect("contention is reported in the response");
    assert!(contended.searchable_text().contains("already in use"));

    driver
        .send(&server, navigate("https://example.com"))
        .await
        .expect("navigation after reset should succeed");

    assert_eq!(launcher.launch_count(), 2);
    assert!(
        launcher
            .transcript()
            .contains(&TranscriptEntry::TerminationRequested(1))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn calls_behind_lock_contention_are_rejected_and_later_calls_respawn(
    fast_settings: SessionSettings,
    server_id: ToolServerId,
) {
    let launcher = ScriptedProcessLauncher::new(with_handshake(|request| {
        let (delay, text) = match argument(request, "url") {
            "locked" => (50, "Error: browser is already in use"),
            "slow" => (300, "navigated slowly"),
            _ => (0, "navigated"),
        };
        vec![
            ScriptStep::Sleep(Duration::from_millis(delay)),
            ScriptStep::result(request, json!({ "content": [{ "type": "text", "text": text }] })),
        ]
    }));
    let settings = SessionSettings {
        call_timeout: Duration::from_secs(5),
        ..fast_settings
    };
    let registry = Arc::new(SessionRegistry::new(Arc::new(launcher.clone()), settings));
    let driver = ProcessDriver::new(Arc::clone(&registry), LockSignatures::default());
    let server = browser_config(server_id, ProcessSessionMode::PersistentAutomation);

    let (contended, behind) = tokio::join!(
        driver.send(&server, navigate("locked")),
        driver.send(&server, navigate("slow")),
    );

    let response = contended.expect("contention is reported in the response");
    assert!(response.searchable_text().contains("already in use"));
    assert!(
        matches!(behind, Err(TransportError::Session(SessionError::Terminated { .. }))),
        "expected the waiting call to be rejected, got {behind:?}"
    );

    driver
        .send(&server, navigate("https://example.com"))
        .await
        .expect("the next call reaches a fresh process");
    assert_eq!(launcher.launch_count(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn standard_sessions_ignore_lock_signatures(
    fast_settings: SessionSettings,
    server_id: ToolServerId,
) {
    let launcher = browser_server();
    let registry = Arc::new(SessionRegistry::new(Arc::new(launcher.clone()), fast_settings));
    let driver = ProcessDriver::new(Arc::clone(&registry), LockSignatures::default());
    let server = browser_config(server_id.clone(), ProcessSessionMode::Standard);

    for url in ["locked", "https://example.com"] {
        driver
            .send(&server, navigate(url))
            .await
            .expect("navigation should succeed");
    }

    assert_eq!(launcher.launch_count(), 1);
    assert_eq!(registry.live_sessions().await, vec![server_id]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn driver_shutdown_tears_down_every_session(fast_settings: SessionSettings) {
    let launcher = browser_server();
    let registry = Arc::new(SessionRegistry::new(Arc::new(launcher.clone()), fast_settings));
    let driver = ProcessDriver::new(Arc::clone(&registry), LockSignatures::default());

    for id in ["left", "right"] {
        let server = browser_config(
            ToolServerId::new(id).expect("valid id"),
            ProcessSessionMode::Standard,
        );
        driver
            .send(&server, navigate("https://example.com"))
            .await
            .expect("navigation should succeed");
    }
    assert_eq!(registry.live_sessions().await.len(), 2);

    driver.shutdown().await;

    assert!(registry.live_sessions().await.is_empty());
    let terminations = launcher
        .transcript()
        .into_iter()
        .filter(|entry| matches!(entry, TranscriptEntry::TerminationRequested(_)))
        .count();
    assert_eq!(terminations, 2);
}
