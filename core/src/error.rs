//! Error types for the ZipTax and TaxCloud clients.
//!
//! # Design
//! Every failure path yields one `ApiError` variant. The variants fall into
//! four groups that drive retry behavior:
//!
//! - *validation* and *configuration* failures are raised before any request
//!   is sent,
//! - *permanent* HTTP failures (401, 403, 404, other 4xx) are never retried,
//! - *transient* failures (5xx, 429, timeouts, connection errors) are retried
//!   by `RetryExecutor`,
//! - `RetryExhausted` wraps the last transient failure once the attempt
//!   budget is spent.

use std::time::Duration;

use crate::http::HttpResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Input rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation needs configuration that was not provided.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication failed: {message}")]
    Authentication { status: u16, message: String },

    #[error("authorization failed: {message}")]
    Authorization { status: u16, message: String },

    #[error("resource not found: {message}")]
    NotFound { message: String },

    /// HTTP 429. `retry_after` comes from the `Retry-After` header when the
    /// server sent one in delta-seconds form.
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    /// Transport failure that retrying cannot fix (bad URI, TLS setup, ...).
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("max retries ({max_retries}) exceeded after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        max_retries: u32,
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// True for failures that a later attempt may not hit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Server { .. }
                | ApiError::RateLimited { .. }
                | ApiError::Timeout(_)
                | ApiError::Connection(_)
        )
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { status, .. }
            | ApiError::Authorization { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Map a non-success response to the matching variant.
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        let message = error_message(response);
        match status {
            401 => ApiError::Authentication { status, message },
            403 => ApiError::Authorization { status, message },
            404 => ApiError::NotFound { message },
            429 => ApiError::RateLimited {
                message,
                retry_after: response
                    .header("retry-after")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs),
            },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Http { status, message },
        }
    }
}

/// Prefer the JSON `message` field, then the raw body.
fn error_message(response: &HttpResponse) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    if response.body.trim().is_empty() {
        format!("HTTP {} error", response.status)
    } else {
        response.body.clone()
    }
}
