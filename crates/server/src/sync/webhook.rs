//! Webhook authenticity verification and topic routing.
//!
//! Shopify signs every delivery with HMAC-SHA256 over the exact raw body
//! bytes, base64-encoded into the `X-Shopify-Hmac-Sha256` header. The
//! signature is checked before the body is ever parsed as JSON; a mismatch
//! is a terminal rejection with zero persistence writes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

/// Header carrying the sender's store domain.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// Header carrying the base64-encoded HMAC-SHA256 signature.
pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

/// Header carrying the event topic (e.g., `orders/create`).
pub const TOPIC_HEADER: &str = "x-shopify-topic";

type HmacSha256 = Hmac<Sha256>;

/// Verify a webhook signature against the raw body bytes.
///
/// Computes HMAC-SHA256 over `body` with the shared secret, base64-encodes
/// it, and requires byte-equality with the provided header value.
#[must_use]
pub fn verify_signature(secret: &SecretString, body: &[u8], provided: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);

    let computed = BASE64.encode(mac.finalize().into_bytes());
    computed.as_bytes() == provided.as_bytes()
}

/// A webhook event topic.
///
/// Topics without a handler are still accepted and acknowledged - a
/// forward-compatible no-op, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTopic {
    /// `orders/create`
    OrdersCreate,
    /// `customers/create`
    CustomersCreate,
    /// Any other topic; carried verbatim for logging.
    Other(String),
}

impl From<&str> for WebhookTopic {
    fn from(s: &str) -> Self {
        match s {
            "orders/create" => Self::OrdersCreate,
            "customers/create" => Self::CustomersCreate,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrdersCreate => write!(f, "orders/create"),
            Self::CustomersCreate => write!(f, "customers/create"),
            Self::Other(topic) => write!(f, "{topic}"),
        }
    }
}
