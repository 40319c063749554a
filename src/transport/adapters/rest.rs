//! Driver for REST-style tool servers with vendor response shapes.

use super::http_support::{request_error, status_error, with_headers};
use crate::protocol::{RpcEnvelope, RpcResponse, methods, normalize::normalize_rest_body};
use crate::tool_registry::domain::{
    RestTransportConfig, ToolServerConfig, ToolServerId, ToolTransport, TransportKind,
};
use crate::transport::{TransportError, ports::TransportDriver};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// REST transport driver.
///
/// `tools/call` posts `{ name, arguments }` to the invoke path, `tools/list`
/// uses GET on the discovery path when one is configured, and everything
/// else posts the envelope to the invoke path.
#[derive(Debug, Clone)]
pub struct RestDriver {
    client: reqwest::Client,
    body_excerpt_chars: usize,
}

impl RestDriver {
    /// Creates a driver using a shared HTTP client.
    #[must_use]
    pub const fn new(client: reqwest::Client, body_excerpt_chars: usize) -> Self {
        Self {
            client,
            body_excerpt_chars,
        }
    }

    async fn fetch(
        &self,
        server_id: &ToolServerId,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|err| request_error(server_id, url, &err))?;
        if !response.status().is_success() {
            return Err(status_error(server_id, response, self.body_excerpt_chars).await);
        }

        let text = response
            .text()
            .await
            .map_err(|err| request_error(server_id, url, &err))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| TransportError::MalformedBody {
            server_id: server_id.clone(),
            message: format!("response from {url} is not JSON: {err}"),
        })
    }

    fn build_request(
        &self,
        config: &RestTransportConfig,
        envelope: &RpcEnvelope,
    ) -> (String, reqwest::RequestBuilder) {
        if envelope.method() == methods::TOOLS_LIST
            && let Some(url) = config.discovery_url()
        {
            let request = self.client.get(&url);
            return (url, with_headers(request, config.headers()));
        }

        let url = config.invoke_url();
        let body = if envelope.method() == methods::TOOLS_CALL {
            json!({
                "name": envelope.params().get("name").cloned().unwrap_or(Value::Null),
                "arguments": envelope.params().get("arguments").cloned().unwrap_or_else(|| json!({})),
            })
        } else {
            serde_json::to_value(envelope).unwrap_or(Value::Null)
        };
        let request = self.client.post(&url).json(&body);
        (url, with_headers(request, config.headers()))
    }
}

#[async_trait]
impl TransportDriver for RestDriver {
    async fn send(
        &self,
        server: &ToolServerConfig,
        envelope: RpcEnvelope,
    ) -> Result<RpcResponse, TransportError> {
        let ToolTransport::Rest(config) = server.transport() else {
            return Err(TransportError::mismatch(
                server.id(),
                TransportKind::Rest,
                server.transport().kind(),
            ));
        };

        let (url, request) = self.build_request(config, &envelope);
        debug!(
            server_id = %server.id(),
            request_id = %envelope.id(),
            method = envelope.method(),
            url = %url,
            "sending REST request"
        );
        let body = self.fetch(server.id(), &url, request).await?;
        Ok(normalize_rest_body(body, envelope.id()))
    }

    async fn probe(&self, server: &ToolServerConfig) -> Option<Result<(), TransportError>> {
        let ToolTransport::Rest(config) = server.transport() else {
            return None;
        };
        let url = config.health_url()?;
        let request = with_headers(self.client.get(&url), config.headers());
        Some(self.fetch(server.id(), &url, request).await.map(|_| ()))
    }
}
