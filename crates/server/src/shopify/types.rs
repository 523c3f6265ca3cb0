//! Raw record shapes returned by the Shopify Admin REST API.
//!
//! These mirror the wire format: numeric ids, string-encoded money amounts,
//! and liberally optional fields. Webhook payloads for `orders/create` and
//! `customers/create` carry the same resource shapes, so both the bulk pull
//! and the event path deserialize into these types - one transform, one
//! convergent result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A customer as returned by `GET /customers.json` or embedded in an order.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCustomer {
    /// Platform-assigned numeric id.
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// String-encoded decimal (e.g., `"199.95"`); absent for new customers.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub total_spent: Option<Decimal>,
}

/// A product as returned by `GET /products.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    /// Platform-assigned numeric id.
    pub id: i64,
    pub title: String,
    /// Variants in display order; the first variant's price is the one we
    /// snapshot.
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
}

/// A product variant; only the price is of interest here.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
}

/// An order as returned by `GET /orders.json` or an `orders/create` webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOrder {
    /// Platform-assigned numeric id.
    pub id: i64,
    /// Embedded customer snapshot; absent for guest checkouts.
    #[serde(default)]
    pub customer: Option<RemoteCustomer>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub total_price: Option<Decimal>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}
