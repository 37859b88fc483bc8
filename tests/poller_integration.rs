//! Integration tests for the readiness poller using wiremock
//!
//! Sequenced responses are mounted in order with `up_to_n_times`, so each
//! mock answers a fixed number of polls before the next one takes over.

use cloudprov::api::{
    poller, ApiError, Credentials, Gateway, GatewayOptions, PollError, PollOptions,
};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JOB_PATH: &str = "/v1/servers/srv-1";

fn gateway(server: &MockServer) -> Gateway {
    let options = GatewayOptions {
        base_url: format!("{}/v1", server.uri()),
        rate_limit: 0.0,
        ..GatewayOptions::default()
    };
    Gateway::with_http(&options, Some(Credentials::from_token("test-token")))
        .expect("gateway should build")
}

fn job_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JOB_PATH)
}

fn fast_polls() -> PollOptions {
    PollOptions::default()
        .with_timeout(Duration::from_secs(5))
        .with_fixed_interval(Duration::from_millis(10))
}

async fn mount_status(server: &MockServer, status: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(JOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "srv-1",
            "status": status
        })));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn poll_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

/// Test module for poller integration tests
mod poller_tests {
    use super::*;

    /// [500, 500, CREATING, READY] succeeds after exactly four attempts
    #[tokio::test]
    async fn test_ready_after_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        mount_status(&server, "CREATING", Some(1)).await;
        mount_status(&server, "READY", None).await;

        poller::wait_until_ready(
            &CancellationToken::new(),
            &gateway(&server),
            &job_url(&server),
            &fast_polls(),
        )
        .await
        .expect("should become ready");

        assert_eq!(poll_count(&server).await, 4);
    }

    /// ERROR status fails without a retry
    #[tokio::test]
    async fn test_error_status_fails_immediately() {
        let server = MockServer::start().await;
        mount_status(&server, "ERROR", None).await;

        let err = poller::wait_until_ready(
            &CancellationToken::new(),
            &gateway(&server),
            &job_url(&server),
            &fast_polls(),
        )
        .await
        .expect_err("should fail");

        assert!(matches!(err, PollError::Failed { .. }));
        assert_eq!(poll_count(&server).await, 1);
    }

    /// 404 is non-retryable and names the endpoint
    #[tokio::test]
    async fn test_not_found_fails_immediately() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Server not found"}
            })))
            .mount(&server)
            .await;

        let url = job_url(&server);
        let err = poller::wait_until_ready(
            &CancellationToken::new(),
            &gateway(&server),
            &url,
            &fast_polls(),
        )
        .await
        .expect_err("should fail");

        match err {
            PollError::Api(ApiError::Remote { status, url: failed_url, message }) => {
                assert_eq!(status, 404);
                assert_eq!(failed_url, url);
                assert_eq!(message, "Server not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(poll_count(&server).await, 1);
    }

    /// Malformed JSON on success ends the wait with the decoding error
    #[tokio::test]
    async fn test_malformed_body_fails_with_decoding_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = poller::wait_until_ready(
            &CancellationToken::new(),
            &gateway(&server),
            &job_url(&server),
            &fast_polls(),
        )
        .await
        .expect_err("should fail");

        assert!(matches!(err, PollError::Api(ApiError::Decoding { .. })));
        assert_eq!(poll_count(&server).await, 1);
    }

    /// Perpetual CREATING with a 50ms timeout and 10ms spacing times out promptly
    #[tokio::test]
    async fn test_perpetual_progress_times_out() {
        let server = MockServer::start().await;
        mount_status(&server, "CREATING", None).await;

        let options = PollOptions::default()
            .with_timeout(Duration::from_millis(50))
            .with_fixed_interval(Duration::from_millis(10));
        let start = Instant::now();

        let err = poller::wait_until_ready(
            &CancellationToken::new(),
            &gateway(&server),
            &job_url(&server),
            &options,
        )
        .await
        .expect_err("should time out");

        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(300), "took {elapsed:?}");
        match err {
            PollError::TimedOut { last_status, .. } => {
                assert_eq!(last_status.as_deref(), Some("CREATING"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Cancellation wins over the timeout and returns promptly
    #[tokio::test]
    async fn test_cancel_mid_wait() {
        let server = MockServer::start().await;
        mount_status(&server, "CREATING", None).await;

        let cancel = CancellationToken::new();
        let options = PollOptions::default()
            .with_timeout(Duration::from_secs(60))
            .with_fixed_interval(Duration::from_secs(5));
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            });
        }

        let start = Instant::now();
        let err = poller::wait_until_ready(&cancel, &gateway(&server), &job_url(&server), &options)
            .await
            .expect_err("should be cancelled");

        assert!(matches!(err, PollError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    /// Gateway shutdown also ends the wait as a cancellation
    #[tokio::test]
    async fn test_gateway_shutdown_cancels_wait() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(JOB_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        {
            let gw = gw.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                gw.shutdown();
            });
        }

        let err = poller::wait_until_ready(
            &CancellationToken::new(),
            &gw,
            &job_url(&server),
            &fast_polls(),
        )
        .await
        .expect_err("should be cancelled");

        assert!(matches!(err, PollError::Cancelled { .. }));
    }
}
