//! Multi-tenant reconciliation engine.
//!
//! Two ingest paths converge on the same persisted snapshot:
//!
//! - **Bulk sync** ([`Reconciler::sync_tenant`]) - full pull of a tenant's
//!   remote collections, in dependency order (customers and products before
//!   orders), with duplicate-skipping batch inserts.
//! - **Event apply** ([`Reconciler::apply_event`]) - incremental merge of a
//!   single webhook delivery, verified and upserted atomically.
//!
//! Both paths are idempotent: re-applying the same input yields no duplicate
//! rows and no changes beyond the latest field values. Tenant isolation is
//! enforced by keying every lookup and write on `(tenant_id, external_id)`.
//!
//! The engine is generic over its seams ([`gateway`]) so it can be driven
//! against in-memory doubles in tests and against `PostgreSQL` plus the live
//! Admin API in production.

pub mod engine;
pub mod gateway;
pub mod identity;
pub mod webhook;

pub use engine::{EventOutcome, Reconciler, SyncReport};
pub use identity::IdentityMap;
pub use webhook::WebhookTopic;

use thiserror::Error;

use crate::db::RepositoryError;
use crate::shopify::FetchError;

/// Errors produced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The addressed tenant is not registered.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    /// Webhook signature verification failed. Terminal: nothing was
    /// persisted and the payload was never parsed.
    #[error("webhook signature verification failed")]
    SignatureRejected,

    /// The payload was malformed or missing required fields.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Remote fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Persistence operation failed.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}
