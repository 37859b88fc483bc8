//! Rate-limited API gateway
//!
//! Every remote call passes through one [`RateLimiter`] before it reaches
//! the transport. The gateway never retries: a failed call comes back to
//! the caller exactly as the transport reported it.

use super::auth::Credentials;
use super::error::ApiError;
use super::http::{ApiRequest, ApiResponse, HttpTransport, Transport};
use super::limiter::{RateLimiter, DEFAULT_RATE_LIMIT};
use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Gateway settings
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Base URL that relative paths are resolved against
    pub base_url: String,
    /// Calls per second
    pub rate_limit: f64,
    pub burst: u32,
    pub user_agent: String,
    /// Per-request transport timeout
    pub request_timeout: Option<Duration>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com/v1/".to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
            burst: 1,
            user_agent: format!("cloudprov/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Rate-limited remote-call dispatcher.
///
/// Clones share the limiter and the shutdown token; the limiter lives as
/// long as the last clone.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    credentials: Option<Credentials>,
    limiter: Arc<RateLimiter>,
    base_url: Url,
    shutdown: CancellationToken,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Option<Credentials>,
        options: &GatewayOptions,
    ) -> Result<Self, ApiError> {
        let mut base = options.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL {base:?}: {e}")))?;

        let limiter = RateLimiter::new(options.rate_limit, options.burst)?;

        Ok(Self {
            transport,
            credentials,
            limiter: Arc::new(limiter),
            base_url,
            shutdown: CancellationToken::new(),
        })
    }

    /// Gateway over the reqwest transport
    pub fn with_http(options: &GatewayOptions, credentials: Option<Credentials>) -> Result<Self> {
        let transport = HttpTransport::new(&options.user_agent, options.request_timeout)?;
        Ok(Self::new(Arc::new(transport), credentials, options)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cancel every pending and future call on this gateway and its clones
    pub fn shutdown(&self) {
        tracing::debug!("Gateway shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("invalid path {path:?}: {e}")))
    }

    /// Issue one call: attach credentials, wait for a limiter token, send.
    ///
    /// The limiter wait is the only suspension point added here; it and the
    /// transport both stop early when `cancel` or the gateway shutdown fires.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        let dispatch = async {
            let url = self.resolve(path)?;
            let bearer = if authenticated {
                let credentials = self.credentials.as_ref().ok_or_else(|| {
                    ApiError::Credentials("no credentials configured".to_string())
                })?;
                Some(credentials.get_token().await?)
            } else {
                None
            };

            self.limiter.acquire(cancel).await?;

            let request = ApiRequest {
                method,
                url,
                body: body.cloned(),
                bearer,
            };
            self.transport.send(request, cancel).await
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(ApiError::Cancelled),
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = dispatch => result,
        }
    }

    // =========================================================================
    // Authenticated calls
    // =========================================================================

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.get_with_cancel(path, &CancellationToken::new()).await
    }

    pub async fn get_with_cancel(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::GET, path, None, true, cancel).await
    }

    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.post_with_cancel(path, body, &CancellationToken::new()).await
    }

    pub async fn post_with_cancel(
        &self,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::POST, path, body, true, cancel).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.put_with_cancel(path, body, &CancellationToken::new()).await
    }

    pub async fn put_with_cancel(
        &self,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::PUT, path, body, true, cancel).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.delete_with_cancel(path, &CancellationToken::new()).await
    }

    pub async fn delete_with_cancel(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::DELETE, path, None, true, cancel).await
    }

    // =========================================================================
    // Unauthenticated calls
    // =========================================================================

    pub async fn get_unauthenticated(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.get_unauthenticated_with_cancel(path, &CancellationToken::new())
            .await
    }

    pub async fn get_unauthenticated_with_cancel(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::GET, path, None, false, cancel).await
    }

    pub async fn post_unauthenticated(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.post_unauthenticated_with_cancel(path, body, &CancellationToken::new())
            .await
    }

    pub async fn post_unauthenticated_with_cancel(
        &self,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::POST, path, body, false, cancel).await
    }

    pub async fn put_unauthenticated(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.put_unauthenticated_with_cancel(path, body, &CancellationToken::new())
            .await
    }

    pub async fn put_unauthenticated_with_cancel(
        &self,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::PUT, path, body, false, cancel).await
    }

    pub async fn delete_unauthenticated(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.delete_unauthenticated_with_cancel(path, &CancellationToken::new())
            .await
    }

    pub async fn delete_unauthenticated_with_cancel(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        self.call(Method::DELETE, path, None, false, cancel).await
    }
}

/// Build `collection/<id>` with the id percent-encoded
pub fn resource_path(collection: &str, id: &str) -> String {
    format!(
        "{}/{}",
        collection.trim_end_matches('/'),
        urlencoding::encode(id)
    )
}
