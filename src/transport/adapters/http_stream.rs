//! Driver for tool servers reached by HTTP POST, answering with a JSON
//! document or a Server-Sent-Events stream.

use super::http_support::{request_error, status_error, with_headers};
use crate::protocol::{
    IncomingMessage, RequestId, RpcEnvelope, RpcNotification, RpcResponse, sse,
};
use crate::tool_registry::domain::{
    HttpStreamTransportConfig, ToolServerConfig, ToolServerId, ToolTransport, TransportKind,
};
use crate::transport::{TransportError, ports::TransportDriver};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Header carrying the server-assigned session identity.
const SESSION_HEADER: &str = "mcp-session-id";

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Per-server state established by the handshake.
#[derive(Debug, Clone, Default)]
struct StreamSession {
    session_id: Option<String>,
}

/// HTTP stream transport driver.
///
/// The first request to a server is preceded by the `initialize` handshake.
/// A session id returned by the server is echoed on later requests.
#[derive(Debug)]
pub struct HttpStreamDriver {
    client: reqwest::Client,
    client_name: String,
    client_version: String,
    body_excerpt_chars: usize,
    sessions: Mutex<HashMap<ToolServerId, StreamSession>>,
}

impl HttpStreamDriver {
    /// Creates a driver using a shared HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client, body_excerpt_chars: usize) -> Self {
        Self {
            client,
            client_name: env!("CARGO_PKG_NAME").to_owned(),
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
            body_excerpt_chars,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the client identity announced in the handshake.
    #[must_use]
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    /// Returns the session id the server assigned, if any.
    #[must_use]
    pub fn session_id(&self, server_id: &ToolServerId) -> Option<String> {
        self.lock_sessions()
            .get(server_id)
            .and_then(|session| session.session_id.clone())
    }

    async fn ensure_session(
        &self,
        server_id: &ToolServerId,
        config: &HttpStreamTransportConfig,
    ) -> Result<(), TransportError> {
        if self.lock_sessions().contains_key(server_id) {
            return Ok(());
        }

        let handshake = RpcEnvelope::initialize(&self.client_name, &self.client_version);
        let exchange = self.post(server_id, config, &handshake, None).await?;
        let session = StreamSession {
            session_id: exchange.session_id.clone(),
        };

        match exchange.into_response(server_id, handshake.id()) {
            Ok(response) if response.is_error() => {
                debug!(server_id = %server_id, "server does not support initialize, continuing");
            }
            Ok(_) => {
                let notification = RpcNotification::initialized();
                if let Err(err) = self
                    .post(server_id, config, &notification, session.session_id.as_deref())
                    .await
                {
                    debug!(server_id = %server_id, error = %err, "initialized notification failed");
                }
            }
            Err(err) => return Err(err),
        }

        debug!(server_id = %server_id, session_id = ?session.session_id, "stream session established");
        self.lock_sessions().insert(server_id.clone(), session);
        Ok(())
    }

    async fn post(
        &self,
        server_id: &ToolServerId,
        config: &HttpStreamTransportConfig,
        body: &impl Serialize,
        session_id: Option<&str>,
    ) -> Result<Exchange, TransportError> {
        let mut request = with_headers(
            self.client
                .post(config.url())
                .header(ACCEPT, ACCEPT_BOTH)
                .json(body),
            config.headers(),
        );
        if let Some(session_id) = session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request
            .send()
            .await
            .map_err(|err| request_error(server_id, config.url(), &err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND && session_id.is_some() {
            warn!(server_id = %server_id, "stream session expired, handshake will be repeated");
            self.lock_sessions().remove(server_id);
        }
        if !status.is_success() {
            return Err(status_error(server_id, response, self.body_excerpt_chars).await);
        }

        let returned_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));
        let text = response
            .text()
            .await
            .map_err(|err| request_error(server_id, config.url(), &err))?;

        Ok(Exchange {
            session_id: returned_session,
            is_event_stream,
            text,
        })
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<ToolServerId, StreamSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Raw outcome of one POST.
struct Exchange {
    session_id: Option<String>,
    is_event_stream: bool,
    text: String,
}

impl Exchange {
    fn into_response(
        self,
        server_id: &ToolServerId,
        request_id: RequestId,
    ) -> Result<RpcResponse, TransportError> {
        let malformed = |message: String| TransportError::MalformedBody {
            server_id: server_id.clone(),
            message,
        };

        let payload = if self.is_event_stream {
            sse::select_payload(&self.text, request_id)
                .ok_or_else(|| malformed("event stream carried no JSON payload".to_owned()))?
        } else {
            serde_json::from_str::<Value>(&self.text).map_err(|err| malformed(err.to_string()))?
        };

        match IncomingMessage::classify(payload) {
            IncomingMessage::Response(response) => {
                if !response.answers(request_id) {
                    warn!(
                        server_id = %server_id,
                        request_id = %request_id,
                        response_id = %response.id(),
                        "response id does not match the request"
                    );
                }
                Ok(response)
            }
            _ => Err(malformed("body is not a JSON-RPC response".to_owned())),
        }
    }
}

#[async_trait]
impl TransportDriver for HttpStreamDriver {
    async fn send(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError> {
        let ToolTransport::HttpStream(config) = server.transport() else {
            return Err(TransportError::mismatch(
                server.id(),
                TransportKind::HttpStream,
                server.transport().kind(),
            ));
        };

        self.ensure_session(server.id(), config).await?;
        let session_id = self.session_id(server.id());
        debug!(
            server_id = %server.id(),
            request_id = %envelope.id(),
            method = envelope.method(),
            "posting request"
        );
        let exchange = self
            .post(server.id(), config, &envelope, session_id.as_deref())
            .await?;
        if let Some(returned) = exchange.session_id.clone()
            && let Some(session) = self.lock_sessions().get_mut(server.id())
        {
            session.session_id = Some(returned);
        }
        exchange.into_response(server.id(), envelope.id())
    }

    async fn forget(&self, server_id: &ToolServerId) {
        self.lock_sessions().remove(server_id);
    }
}
