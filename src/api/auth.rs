//! API Credentials
//!
//! Supplies bearer tokens for authenticated gateway calls. Tokens come
//! from a [`TokenProvider`] and are cached until shortly before expiry.

use super::error::ApiError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Environment variable read by [`EnvToken::default`]
pub const TOKEN_ENV_VAR: &str = "CLOUDPROV_TOKEN";

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// A token and how long it stays valid (`None` = does not expire)
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub ttl: Option<Duration>,
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<IssuedToken, ApiError>;
}

/// A fixed token from configuration
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<IssuedToken, ApiError> {
        Ok(IssuedToken {
            token: self.0.clone(),
            ttl: None,
        })
    }
}

/// Reads the token from an environment variable on every fetch, so a
/// rotated token is picked up after [`Credentials::refresh_token`]
pub struct EnvToken {
    var: String,
    ttl: Option<Duration>,
}

impl EnvToken {
    pub fn new(var: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            var: var.into(),
            ttl,
        }
    }
}

impl Default for EnvToken {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR, None)
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> Result<IssuedToken, ApiError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(IssuedToken {
                token: token.trim().to_string(),
                ttl: self.ttl,
            }),
            _ => Err(ApiError::Credentials(format!("{} is not set", self.var))),
        }
    }
}

/// Credentials holder with token caching
#[derive(Clone)]
pub struct Credentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

impl Credentials {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Arc::new(StaticToken::new(token)))
    }

    pub fn from_env(var: impl Into<String>) -> Self {
        Self::new(Arc::new(EnvToken::new(var, None)))
    }

    /// Get a bearer token, fetching a new one when the cached token is stale
    pub async fn get_token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let issued = self.provider.token().await?;
        let expires_at = issued
            .ttl
            .map(|ttl| Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER));

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: issued.token.clone(),
                expires_at,
            });
        }

        match issued.ttl {
            Some(ttl) => tracing::debug!("New token cached, expires in ~{}s", ttl.as_secs()),
            None => tracing::debug!("New token cached"),
        }

        Ok(issued.token)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }

        self.get_token().await
    }
}
