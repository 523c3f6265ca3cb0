//! Insert-shape records produced by the reconciliation engine.
//!
//! These are the normalized forms handed to the persistence gateway. They
//! carry no tenant id: the gateway takes the tenant as a separate mandatory
//! parameter on every operation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tidesync_core::{CustomerId, ExternalId};

/// A customer row ready for insert or upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    /// Identifier assigned by the remote platform.
    pub external_id: ExternalId,
    /// Email address, if the platform exposes one.
    pub email: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Accumulated spend; zero when the platform omits it.
    pub total_spent: Decimal,
}

/// A product row ready for insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    /// Identifier assigned by the remote platform.
    pub external_id: ExternalId,
    /// Product title.
    pub title: String,
    /// Price of the first variant; zero when the platform omits it.
    pub price: Decimal,
}

/// An order row ready for insert.
///
/// `customer_id` is the *internal* customer id resolved through the identity
/// map - never the raw external customer id. It is `None` for guest checkouts
/// or when the referenced customer is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    /// Identifier assigned by the remote platform.
    pub external_id: ExternalId,
    /// Internal customer reference, if resolvable.
    pub customer_id: Option<CustomerId>,
    /// Order total.
    pub total_price: Decimal,
    /// ISO 4217 currency code as reported by the platform.
    pub currency: String,
    /// When the order was placed on the remote platform.
    pub placed_at: DateTime<Utc>,
}
