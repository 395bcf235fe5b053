//! Shared HTTP plumbing for the hosted API clients
//!
//! Every client funnels requests through [`with_retry`], which retries
//! transient failures with exponential backoff, and maps non-success
//! statuses onto [`ApiError`] via [`classify_status`]. Calls with side
//! effects (sending mail, uploading, creating folders, paid generations)
//! use [`RetryPolicy::side_effecting`] so they are only repeated when the
//! server cannot have seen them.

use crate::config::HttpConfig;
use crate::error::{ApiError, Error, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry behaviour for a single logical request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts including the first (default: 3)
    pub max_retries: u32,
    /// Initial backoff, doubled after each failed attempt (default: 1000ms)
    pub initial_backoff_ms: u64,
    /// Upper bound on any single wait, including `Retry-After` (default: 60s)
    pub max_wait_ms: u64,
    /// Only retry failures the server cannot have acted on
    pub side_effects: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_wait_ms: 60_000,
            side_effects: false,
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            max_wait_ms: config.timeout_secs.saturating_mul(1000).max(1000),
            ..Default::default()
        }
    }
}

impl RetryPolicy {
    /// Same budget, restricted to connection failures and rate limits
    pub fn side_effecting(&self) -> Self {
        Self {
            side_effects: true,
            ..self.clone()
        }
    }

    fn should_retry(&self, err: &Error) -> bool {
        if self.side_effects {
            err.is_safe_to_resend()
        } else {
            err.is_retryable()
        }
    }

    fn wait_ms(&self, err: &Error, backoff_ms: u64) -> u64 {
        err.retry_after()
            .map(|secs| secs.saturating_mul(1000))
            .unwrap_or(backoff_ms)
            .min(self.max_wait_ms)
    }
}

/// Build a client with the configured request timeout
pub fn client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| {
            Error::Api(ApiError::RequestFailed {
                service: "http".to_string(),
                source: format!("Failed to build client: {}", e),
            })
        })
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
pub async fn with_retry<T, F, Fut>(service: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    let mut backoff_ms = policy.initial_backoff_ms;

    loop {
        attempts += 1;
        debug!("{} request attempt {} of {}", service, attempts, policy.max_retries);

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempts >= policy.max_retries => {
                warn!("{} request failed after {} attempts", service, attempts);
                return Err(e);
            }
            Err(e) if policy.should_retry(&e) => {
                let wait_ms = policy.wait_ms(&e, backoff_ms);
                warn!(
                    "{} request failed (attempt {}), retrying in {}ms: {}",
                    service, attempts, wait_ms, e
                );
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                backoff_ms = backoff_ms.saturating_mul(2);
            }
            Err(e) => {
                warn!("{} request failed with non-retryable error: {}", service, e);
                return Err(e);
            }
        }
    }
}

/// Map an HTTP status onto the API error taxonomy
pub fn classify_status(service: &str, status: u16, retry_after: Option<u64>, body: &str) -> Error {
    let err = match status {
        401 | 403 => ApiError::AuthenticationFailed(service.to_string()),
        429 => ApiError::RateLimitExceeded {
            service: service.to_string(),
            retry_after,
        },
        500..=599 => ApiError::ServiceUnavailable(service.to_string()),
        400..=499 if status != 408 => ApiError::Rejected {
            service: service.to_string(),
            status,
            details: truncate(body, 200),
        },
        _ => ApiError::RequestFailed {
            service: service.to_string(),
            source: format!("HTTP {}: {}", status, truncate(body, 200)),
        },
    };
    Error::Api(err)
}

/// Parse a numeric `Retry-After` header (seconds form only)
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Convert a transport-level reqwest failure
pub fn transport_error(service: &str, err: reqwest::Error) -> Error {
    if err.is_connect() {
        return Error::Api(ApiError::ConnectFailed {
            service: service.to_string(),
            source: err.to_string(),
        });
    }
    let source = if err.is_timeout() {
        "Request timed out".to_string()
    } else {
        err.to_string()
    };
    Error::Api(ApiError::RequestFailed {
        service: service.to_string(),
        source,
    })
}

/// Pass successful responses through, convert the rest into errors
pub async fn check_status(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let wait = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(service, status.as_u16(), wait, &body))
}

/// Read a successful response body as JSON
pub async fn json_body<T: DeserializeOwned>(service: &str, response: reqwest::Response) -> Result<T> {
    let response = check_status(service, response).await?;
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(service, e))?;

    serde_json::from_str(&text).map_err(|e| {
        Error::Api(ApiError::InvalidResponse {
            service: service.to_string(),
            details: format!("Failed to parse JSON: {}. Body: {}", e, truncate(&text, 200)),
        })
    })
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
