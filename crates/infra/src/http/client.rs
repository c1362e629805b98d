//! Token endpoint transport
//!
//! Form POSTs with bounded retries. Each failed attempt is classified through
//! [`ErrorClassification`]: connection failures, timeouts, `429` and `5xx`
//! responses are retryable, anything else is handed back to the caller as is.
//! A `Retry-After` header replaces the exponential backoff for that attempt,
//! capped at the configured maximum delay. Requests marked [`Replay::Never`]
//! are sent exactly once.

use std::time::Duration;

use authsession_common::{ErrorClassification, ErrorSeverity};
use authsession_domain::{Result, SessionError};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use tracing::{debug, error, warn};

use crate::errors::InfraError;

const DEFAULT_USER_AGENT: &str = concat!("authsession/", env!("CARGO_PKG_VERSION"));

/// Whether a request may be sent again after a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Resend on retryable failures (refresh grants).
    Allowed,
    /// Send once. Authorization codes are single-use.
    Never,
}

/// HTTP client for token endpoint requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: u32,
    base_backoff: Duration,
    max_delay: Duration,
}

impl HttpClient {
    /// Start building a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeouts and retry budget.
    ///
    /// # Errors
    /// Returns `SessionError::Provider` when the TLS backend cannot be
    /// initialised.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// POST `form` to `url`.
    ///
    /// Non-success responses that are not retryable, or that remain after the
    /// last attempt, are returned so the caller can read the OAuth error body.
    ///
    /// # Errors
    /// Returns the mapped transport error when no response was received.
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)], replay: Replay) -> Result<Response> {
        let attempts = match replay {
            Replay::Allowed => self.max_attempts,
            Replay::Never => 1,
        };

        let mut attempt = 1;
        loop {
            debug!(attempt, %url, "posting token endpoint form");
            let failure = match self.client.post(url).form(form).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let failure = AttemptFailure::Status {
                        status: response.status(),
                        retry_after: retry_after(response.headers(), Utc::now()),
                    };
                    if attempt >= attempts || !failure.is_retryable() {
                        return Ok(response);
                    }
                    failure
                }
                Err(err) => {
                    let failure = AttemptFailure::Transport(err);
                    if attempt >= attempts || !failure.is_retryable() {
                        log_final(&failure, attempt);
                        return Err(failure.into());
                    }
                    failure
                }
            };

            let delay = self.delay_for(&failure, attempt);
            warn!(attempt, %url, %failure, ?delay, "token endpoint attempt failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn delay_for(&self, failure: &AttemptFailure, attempt: u32) -> Duration {
        let delay = failure.retry_after().unwrap_or_else(|| {
            let exponent = attempt.saturating_sub(1).min(16);
            self.base_backoff.saturating_mul(1u32 << exponent)
        });
        delay.min(self.max_delay)
    }
}

fn log_final(failure: &AttemptFailure, attempt: u32) {
    match failure.severity() {
        ErrorSeverity::Info | ErrorSeverity::Warning => {
            warn!(attempt, %failure, "token endpoint unreachable");
        }
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(attempt, %failure, "token endpoint request failed");
        }
    }
}

/// Why one attempt did not produce a usable response.
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error("{0}")]
    Transport(reqwest::Error),
    #[error("HTTP {status}")]
    Status { status: StatusCode, retry_after: Option<Duration> },
}

impl ErrorClassification for AttemptFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }

    fn severity(&self) -> ErrorSeverity {
        if self.is_retryable() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            Self::Transport(_) => None,
        }
    }
}

impl From<AttemptFailure> for SessionError {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Transport(err) => InfraError::from(err).into(),
            AttemptFailure::Status { status, .. } => {
                Self::Provider(format!("token endpoint returned HTTP {}", status.as_u16()))
            }
        }
    }
}

/// `Retry-After` as delta-seconds or an HTTP date. Dates in the past yield
/// `None`.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    (at.with_timezone(&Utc) - now).to_std().ok()
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    max_delay: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of attempts for replayable requests (at least one).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; doubled for each further one.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Upper bound for any retry delay, including `Retry-After`.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// `User-Agent` header sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns `SessionError::Provider` when reqwest cannot build its client.
    pub fn build(self) -> Result<HttpClient> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(InfraError::from)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
            max_delay: self.max_delay,
        })
    }
}
