//! Helpers shared by the HTTP-based drivers.

use crate::tool_registry::domain::ToolServerId;
use crate::transport::TransportError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Longest response body excerpt carried in status errors.
pub const DEFAULT_BODY_EXCERPT_CHARS: usize = 2000;

/// Builds the HTTP client shared by the stream and REST drivers.
///
/// # Errors
///
/// Returns [`TransportError::ClientSetup`] when the TLS backend cannot be
/// initialized.
pub fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| TransportError::ClientSetup(err.to_string()))
}

pub(super) fn with_headers(
    mut request: reqwest::RequestBuilder,
    headers: &BTreeMap<String, String>,
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

pub(super) fn request_error(server_id: &ToolServerId, url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::HttpTimeout {
            server_id: server_id.clone(),
            url: url.to_owned(),
        }
    } else {
        TransportError::Http {
            server_id: server_id.clone(),
            url: url.to_owned(),
            message: err.to_string(),
        }
    }
}

/// Turns a non-success response into a status error with a truncated body.
pub(super) async fn status_error(
    server_id: &ToolServerId,
    response: reqwest::Response,
    excerpt_chars: usize,
) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TransportError::Status {
        server_id: server_id.clone(),
        status,
        body: truncate_chars(&body, excerpt_chars),
    }
}

pub(super) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text.get(..cut).unwrap_or(text).to_owned(),
        None => text.to_owned(),
    }
}
