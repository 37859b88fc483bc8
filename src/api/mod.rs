//! Cloud API interaction module
//!
//! This module provides the remote-call side of the provider: credentials,
//! the HTTP transport, the rate-limited [`Gateway`] every call goes
//! through, and the readiness poller for asynchronous operations.
//!
//! # Module Structure
//!
//! - [`auth`] - bearer token providers with caching
//! - [`client`] - the rate-limited gateway
//! - [`error`] - error kinds and retry classification
//! - [`http`] - transport trait and reqwest implementation
//! - [`limiter`] - shared token-bucket rate limiter
//! - [`poller`] - wait-until-ready loop
//!
//! # Example
//!
//! ```ignore
//! use cloudprov::api::{poller, Credentials, Gateway, GatewayOptions, PollOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let gateway = Gateway::with_http(&GatewayOptions::default(), Some(Credentials::from_token("t")))?;
//!     let created = gateway.post("servers", Some(&serde_json::json!({"name": "web"}))).await?;
//!     let href = created.body["href"].as_str().unwrap_or_default();
//!     poller::wait_until_ready(&CancellationToken::new(), &gateway, href, &PollOptions::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod limiter;
pub mod poller;

pub use auth::{Credentials, EnvToken, IssuedToken, StaticToken, TokenProvider};
pub use client::{resource_path, Gateway, GatewayOptions};
pub use error::{format_api_error, ApiError};
pub use http::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use limiter::RateLimiter;
pub use poller::{wait_until_ready, PollError, PollOptions, PollState};
pub use reqwest::Method;
