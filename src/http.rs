//! HTTP client shared foundation
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout, User-Agent and TLS verification
//! - Cancellable single-shot requests for the scan path
//! - JSON POST with exponential backoff and jitter for notifications

use crate::credentials::Credentials;
use crate::error::NotifyError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("chartwatch/", env!("CARGO_PKG_VERSION"));

/// Maximum number of delivery attempts for JSON POSTs
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Failure of a single cancellable request
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// HTTP client wrapper with cancellation and retry logic
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, false)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        timeout: Duration,
        user_agent: &str,
        insecure: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(insecure)
            .build()?;

        Ok(Self {
            client,
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
        })
    }

    /// Create a client that skips TLS certificate verification when `insecure` is set
    pub fn with_insecure(insecure: bool) -> Result<Self, reqwest::Error> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, insecure)
    }

    /// Set the maximum number of attempts for JSON POSTs
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base backoff delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Perform a GET request with an Accept header and optional basic auth
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        url: &str,
        accept: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Response, RequestError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        self.send(cancel, request).await
    }

    /// Sends a prepared request, returning early if `cancel` fires
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        request: RequestBuilder,
    ) -> Result<Response, RequestError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
            result = request.send() => Ok(result?),
        }
    }

    /// Reads a response body, returning early if `cancel` fires
    pub async fn text(
        &self,
        cancel: &CancellationToken,
        response: Response,
    ) -> Result<String, RequestError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RequestError::Cancelled),
            result = response.text() => Ok(result?),
        }
    }

    /// POST a JSON payload with retry logic
    ///
    /// Transport errors, 5xx and 429 are retried with exponential backoff
    /// plus jitter. Any other non-2xx status fails immediately.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        url: &str,
        payload: &T,
    ) -> Result<(), NotifyError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying HTTP notification after delay");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(NotifyError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            } else {
                debug!("sending HTTP notification");
            }

            let request = self.client.post(url).json(payload);
            let response = match self.send(cancel, request).await {
                Ok(response) => response,
                Err(RequestError::Cancelled) => return Err(NotifyError::Cancelled),
                Err(RequestError::Transport(e)) => {
                    last_error = format!("failed to send request: {}", e);
                    warn!(attempt = attempt + 1, error = %e, "HTTP request failed, will retry");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                if attempt > 0 {
                    info!(attempts = attempt + 1, "HTTP notification succeeded after retry");
                }
                return Ok(());
            }

            if is_retryable(status) {
                last_error = format!("server returned retryable status {}", status.as_u16());
                warn!(status = status.as_u16(), attempt = attempt + 1, "server error, will retry");
                continue;
            }

            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        Err(NotifyError::RetriesExhausted {
            attempts: self.max_attempts,
            message: last_error,
        })
    }
}

/// 5xx and 429 are worth retrying
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// `base * 2^(attempt-1)` plus 10-30% jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let delay = base.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let factor = 0.2 * (0.5 + f64::from(nanos % 100) / 100.0);
    delay + delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_client_with_config() {
        let client = HttpClient::with_config(Duration::from_secs(60), "test-agent/1.0", true);
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_client_builders() {
        let client = HttpClient::new()
            .unwrap()
            .with_max_attempts(0)
            .with_base_delay(Duration::from_millis(5));
        assert_eq!(client.max_attempts, 1);
        assert_eq!(client.base_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(30));
        assert!(DEFAULT_USER_AGENT.starts_with("chartwatch/"));
        assert_eq!(MAX_ATTEMPTS, 3);
        assert_eq!(BASE_DELAY, Duration::from_secs(1));
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_backoff_delay_grows() {
        let base = Duration::from_millis(100);
        let first = backoff_delay(base, 1);
        let second = backoff_delay(base, 2);
        assert!(first >= Duration::from_millis(110) && first <= Duration::from_millis(130));
        assert!(second >= Duration::from_millis(220) && second <= Duration::from_millis(260));
    }

    #[tokio::test]
    async fn test_send_cancelled() {
        let client = HttpClient::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = client
            .get(&cancel, "http://127.0.0.1:9/index.yaml", "*/*", None)
            .await;
        assert!(matches!(result, Err(RequestError::Cancelled)));
    }
}
