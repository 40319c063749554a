//! Scripted transport driver and fixtures shared by gateway tests.

use crate::clock::ManualClock;
use crate::gateway::{TransportDrivers, TransportRouter};
use crate::protocol::{RpcEnvelope, RpcResponse, methods};
use crate::schema_cache::{ToolDenyList, ToolSchemaCache};
use crate::tool_registry::domain::{
    ProcessSessionMode, ProcessTransportConfig, ToolServerConfig, ToolServerId, ToolTransport,
};
use crate::transport::{TransportError, ports::TransportDriver};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Identity whose requests always fail at the transport layer.
pub(super) const BROKEN: &str = "broken";

/// Answers `tools/list` with a fixed list and echoes `tools/call` arguments.
#[derive(Default)]
pub(super) struct ScriptedDriver {
    sent: Mutex<Vec<(ToolServerId, String)>>,
    forgotten: Mutex<Vec<ToolServerId>>,
    shutdowns: Mutex<usize>,
    probe: Option<bool>,
}

impl ScriptedDriver {
    pub(super) fn with_probe(healthy: bool) -> Self {
        Self {
            probe: Some(healthy),
            ..Self::default()
        }
    }

    pub(super) fn sent_methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, method)| method.clone())
            .collect()
    }

    pub(super) fn count(&self, method: &str) -> usize {
        self.sent_methods()
            .iter()
            .filter(|sent| sent.as_str() == method)
            .count()
    }

    pub(super) fn forgotten(&self) -> Vec<ToolServerId> {
        self.forgotten
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn shutdowns(&self) -> usize {
        *self.shutdowns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportDriver for ScriptedDriver {
    async fn send(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((server.id().clone(), envelope.method().to_owned()));

        if server.id().as_str() == BROKEN {
            return Err(TransportError::Http {
                server_id: server.id().clone(),
                url: "http://127.0.0.1:1/".to_owned(),
                message: "connection refused".to_owned(),
            });
        }

        let result = match envelope.method() {
            methods::TOOLS_LIST => json!({
                "tools": [
                    {"name": "echo", "description": "Echo input", "inputSchema": {"type": "object"}},
                    {"name": "secret", "inputSchema": {"type": "object"}},
                    {"description": "entry without a name"}
                ]
            }),
            methods::TOOLS_CALL => envelope
                .params()
                .get("arguments")
                .cloned()
                .unwrap_or_default(),
            _ => json!({}),
        };
        Ok(RpcResponse::success(envelope.id(), result))
    }

    async fn probe(&self, server: &ToolServerConfig) -> Option<Result<(), TransportError>> {
        self.probe.map(|healthy| {
            if healthy {
                Ok(())
            } else {
                Err(TransportError::Status {
                    server_id: server.id().clone(),
                    status: 503,
                    body: "maintenance".to_owned(),
                })
            }
        })
    }

    async fn forget(&self, server_id: &ToolServerId) {
        self.forgotten
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(server_id.clone());
    }

    async fn shutdown(&self) {
        *self.shutdowns.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

pub(super) fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0)
            .single()
            .expect("valid instant"),
    ))
}

pub(super) fn server_id(raw: &str) -> ToolServerId {
    ToolServerId::new(raw).expect("valid server id")
}

pub(super) fn process_server(raw: &str) -> ToolServerConfig {
    ToolServerConfig::new(
        server_id(raw),
        raw.to_uppercase(),
        ToolTransport::process("tool-server").expect("valid command"),
    )
    .expect("valid server")
}

/// Persistent automation server declared without an execution mode.
pub(super) fn automation_server(raw: &str) -> ToolServerConfig {
    let transport = ProcessTransportConfig::new("browser-server")
        .expect("valid command")
        .with_session_mode(ProcessSessionMode::PersistentAutomation);
    ToolServerConfig::new(server_id(raw), raw.to_uppercase(), ToolTransport::Process(transport))
        .expect("valid server")
}

pub(super) fn rest_server(raw: &str) -> ToolServerConfig {
    ToolServerConfig::new(
        server_id(raw),
        raw.to_uppercase(),
        ToolTransport::rest("https://tools.example.com").expect("valid url"),
    )
    .expect("valid server")
}

/// Router whose process driver is `process` and whose REST driver is
/// `rest`; the HTTP stream slot reuses `rest`.
pub(super) fn router(
    process: &Arc<ScriptedDriver>,
    rest: &Arc<ScriptedDriver>,
    clock: &Arc<ManualClock>,
) -> TransportRouter<ManualClock> {
    let deny_list = ToolDenyList::new().deny(server_id("echo"), "secret");
    let cache = Arc::new(ToolSchemaCache::new(
        Arc::clone(clock),
        Duration::from_secs(45),
        deny_list,
    ));
    let process_driver: Arc<dyn TransportDriver> = process.clone();
    let rest_driver: Arc<dyn TransportDriver> = rest.clone();
    TransportRouter::new(
        TransportDrivers {
            process: process_driver,
            http_stream: Arc::clone(&rest_driver),
            rest: rest_driver,
        },
        cache,
        Arc::clone(clock),
    )
}
