//! Asynchronous readiness poller
//!
//! Turns a fire-and-forget remote operation into a blocking wait: the
//! resource endpoint is read through the [`Gateway`] until its status
//! field reports a terminal value, the overall timeout passes, or the
//! caller cancels.

use super::client::Gateway;
use super::error::ApiError;
use super::http::ApiResponse;
use crate::value::TriState;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Status value reported by a resource that finished provisioning
pub const STATUS_READY: &str = "READY";

/// Status value reported by a resource that failed
pub const STATUS_ERROR: &str = "ERROR";

/// Long-running provisioning operations can take up to an hour
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub const DEFAULT_STATUS_FIELD: &str = "status";

/// Poll timing and the field carrying the domain status
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Overall wall-clock limit
    pub timeout: Duration,
    /// Delay after the first attempt; doubles up to `max_interval`
    pub interval: Duration,
    pub max_interval: Duration,
    pub status_field: String,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            status_field: DEFAULT_STATUS_FIELD.to_string(),
        }
    }
}

impl PollOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll at a constant spacing
    pub fn with_fixed_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.max_interval = interval;
        self
    }

    pub fn with_status_field(mut self, field: impl Into<String>) -> Self {
        self.status_field = field.into();
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval.max(self.interval))
    }
}

/// Poll state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Ready,
    Failed(String),
    TimedOut,
}

/// Terminal outcome of an unsuccessful wait
#[derive(Debug, Error)]
pub enum PollError {
    #[error("operation at {url} failed: {reason}")]
    Failed { url: String, reason: String },

    #[error(
        "timed out after {elapsed:?} waiting for {url} to become ready \
         ({attempts} attempts, last status: {}, last error: {})",
        .last_status.as_deref().unwrap_or("none"),
        .last_error.as_deref().unwrap_or("none")
    )]
    TimedOut {
        url: String,
        elapsed: Duration,
        attempts: u32,
        last_status: Option<String>,
        last_error: Option<String>,
    },

    #[error("wait for {url} cancelled")]
    Cancelled { url: String },

    /// Non-retryable gateway error, as the gateway reported it
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Per-call record of one wait
#[derive(Debug)]
struct PollRecord<'a> {
    url: &'a str,
    started: Instant,
    started_at: DateTime<Utc>,
    attempts: u32,
    last_status: Option<String>,
    last_error: Option<String>,
    /// Gateway error that ended the wait
    terminal: Option<ApiError>,
    state: PollState,
}

impl<'a> PollRecord<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            started: Instant::now(),
            started_at: Utc::now(),
            attempts: 0,
            last_status: None,
            last_error: None,
            terminal: None,
            state: PollState::Polling,
        }
    }

    /// Apply one attempt's outcome and return the new state
    fn observe(&mut self, outcome: Result<ApiResponse, ApiError>, status_field: &str) -> &PollState {
        self.attempts += 1;
        self.state = match outcome {
            Err(err) if err.is_retryable() => {
                tracing::warn!(url = self.url, attempt = self.attempts, "Retryable poll failure: {}", err);
                self.last_error = Some(err.to_string());
                PollState::Polling
            }
            Err(err) => {
                let reason = err.to_string();
                self.last_error = Some(reason.clone());
                self.terminal = Some(err);
                PollState::Failed(reason)
            }
            Ok(response) => {
                let field = response.body.get(status_field).unwrap_or(&serde_json::Value::Null);
                match TriState::<String>::from_json_value(field) {
                    Ok(TriState::Known(status)) => {
                        let next = classify_status(&status);
                        tracing::debug!(url = self.url, attempt = self.attempts, "Observed status {}", status);
                        self.last_status = Some(status);
                        next
                    }
                    Ok(_) => {
                        tracing::debug!(url = self.url, "Status field {} not reported yet", status_field);
                        PollState::Polling
                    }
                    Err(err) => {
                        let reason = format!("unreadable {status_field} field: {err}");
                        self.last_error = Some(reason.clone());
                        PollState::Failed(reason)
                    }
                }
            }
        };
        &self.state
    }

    fn timed_out(mut self) -> PollError {
        self.state = PollState::TimedOut;
        tracing::error!(
            url = self.url,
            state = ?self.state,
            started_at = %self.started_at,
            attempts = self.attempts,
            "Timed out waiting for resource"
        );
        PollError::TimedOut {
            url: self.url.to_string(),
            elapsed: self.started.elapsed(),
            attempts: self.attempts,
            last_status: self.last_status,
            last_error: self.last_error,
        }
    }

    fn cancelled(&self) -> PollError {
        tracing::info!(url = self.url, attempts = self.attempts, "Wait cancelled");
        PollError::Cancelled {
            url: self.url.to_string(),
        }
    }
}

/// Map a reported domain status to the next poll state
pub fn classify_status(status: &str) -> PollState {
    match status {
        STATUS_READY => PollState::Ready,
        STATUS_ERROR => PollState::Failed(format!("resource reported status {STATUS_ERROR}")),
        other => {
            tracing::trace!("Resource still in progress: {}", other);
            PollState::Polling
        }
    }
}

/// Block until the resource at `url` reports `READY`.
///
/// Transport failures and 5xx responses are retried; other API errors and
/// an `ERROR` status end the wait immediately. Cancellation wins over the
/// timeout when both are due.
pub async fn wait_until_ready(
    cancel: &CancellationToken,
    gateway: &Gateway,
    url: &str,
    options: &PollOptions,
) -> Result<(), PollError> {
    let mut record = PollRecord::new(url);
    let deadline = record
        .started
        .checked_add(options.timeout)
        .unwrap_or_else(|| record.started + DEFAULT_POLL_TIMEOUT * 24 * 365);
    let mut delay = options.interval;

    tracing::debug!(url, timeout = ?options.timeout, "Waiting for resource to become ready");

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(record.cancelled()),
            _ = tokio::time::sleep_until(deadline) => return Err(record.timed_out()),
            outcome = gateway.get_with_cancel(url, cancel) => outcome,
        };

        if matches!(outcome, Err(ApiError::Cancelled)) {
            return Err(record.cancelled());
        }

        let state = record.observe(outcome, &options.status_field).clone();
        match state {
            PollState::Ready => {
                tracing::info!(url, attempts = record.attempts, "Resource is ready");
                return Ok(());
            }
            PollState::Failed(reason) => {
                tracing::error!(url, attempts = record.attempts, "Resource failed: {}", reason);
                if let Some(err) = record.terminal.take() {
                    return Err(PollError::Api(err));
                }
                return Err(PollError::Failed {
                    url: url.to_string(),
                    reason,
                });
            }
            PollState::Polling | PollState::TimedOut => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(record.cancelled()),
            _ = tokio::time::sleep_until(deadline) => return Err(record.timed_out()),
            _ = tokio::time::sleep(delay) => {}
        }
        delay = options.next_delay(delay);
    }
}
