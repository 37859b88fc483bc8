//! HTTP transport for cloud API calls

use super::error::ApiError;
use crate::value::ValueError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying a per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a human-readable message out of an API error body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|json| {
        json.pointer("/error/message")
            .or_else(|| json.get("message"))
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        None => sanitize_for_log(body),
    }
}

/// A fully resolved request handed to a [`Transport`]
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    /// Present only for authenticated calls
    pub bearer: Option<String>,
}

/// Successful API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub url: String,
    /// Parsed body; empty bodies are `null`
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body, routing tri-state fields through the value adapters
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| ApiError::Decoding {
            url: self.url.clone(),
            source: ValueError::interchange(e),
        })
    }
}

/// Sends one request to the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request, aborting promptly if `cancel` fires
    async fn send(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        let url = request.url.to_string();
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let request_url = url.clone();
        let exchange = async move {
            let transport_error = |e: reqwest::Error| ApiError::Transport {
                url: request_url.clone(),
                message: e.to_string(),
            };
            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status();
            let body = response.text().await.map_err(transport_error)?;
            Ok::<_, ApiError>((status, body))
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            result = exchange => result?,
        };

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::warn!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::Remote {
                status: status.as_u16(),
                url,
                message: error_message(&body, status),
            });
        }

        // Handle empty response
        let body = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).map_err(|e| ApiError::Decoding {
                url: url.clone(),
                source: ValueError::interchange(e),
            })?
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            url,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("truncated, 500 bytes total"));
    }

    #[test]
    fn test_sanitize_handles_multibyte() {
        let body = "é".repeat(300);
        // must not panic on a char boundary
        let _ = sanitize_for_log(&body);
    }

    #[test]
    fn test_error_message_shapes() {
        let nested = r#"{"error": {"code": 404, "message": "Server not found"}}"#;
        assert_eq!(error_message(nested, StatusCode::NOT_FOUND), "Server not found");

        let flat = r#"{"message": "quota exceeded"}"#;
        assert_eq!(error_message(flat, StatusCode::FORBIDDEN), "quota exceeded");

        assert_eq!(
            error_message("", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
        assert_eq!(error_message("plain text", StatusCode::BAD_REQUEST), "plain text");
    }
}
