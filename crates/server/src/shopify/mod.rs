//! Shopify Admin REST API client.
//!
//! Fetches a tenant's customer, product, and order collections with the
//! tenant's own access token. Each collection is exposed as a lazy,
//! restartable stream that follows Shopify's cursor pagination (`Link`
//! response header); nothing is cached, so every pull reflects remote state
//! at call time.
//!
//! # Error taxonomy
//!
//! Callers decide retry policy from the error kind:
//! - [`FetchError::Unauthorized`] - the stored credential was rejected;
//!   never retried automatically
//! - [`FetchError::RateLimited`] / [`FetchError::Transient`] - eligible for
//!   caller-driven retry with backoff
//! - [`FetchError::Parse`] / [`FetchError::Api`] - surfaced as-is

mod client;
mod types;

pub use client::{AdminRestClient, ShopifyRemote};
pub use types::{RemoteCustomer, RemoteOrder, RemoteProduct, RemoteVariant};

use thiserror::Error;

/// Errors that can occur when fetching from the Shopify Admin API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The tenant's access token was rejected (401/403).
    #[error("unauthorized: credential rejected by remote store")]
    Unauthorized,

    /// Rate limited by Shopify (429).
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Network failure, timeout, or remote 5xx. Safe to retry with backoff.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// Unexpected non-success status from the remote API.
    #[error("remote API error: status {0}")]
    Api(u16),

    /// The response body could not be parsed.
    #[error("failed to parse remote response: {0}")]
    Parse(String),

    /// The request URL could not be constructed.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    /// Classify a `reqwest` transport error.
    fn from_request(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            // Timeouts, connection failures, and anything else on the wire
            // are retryable from the caller's perspective.
            Self::Transient(e.to_string())
        }
    }

    /// Whether a caller-driven retry with backoff may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Unauthorized;
        assert_eq!(
            err.to_string(),
            "unauthorized: credential rejected by remote store"
        );

        let err = FetchError::RateLimited(4);
        assert_eq!(err.to_string(), "rate limited, retry after 4 seconds");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Transient("connection reset".to_string()).is_retryable());
        assert!(FetchError::RateLimited(2).is_retryable());
        assert!(!FetchError::Unauthorized.is_retryable());
        assert!(!FetchError::Api(422).is_retryable());
    }
}
