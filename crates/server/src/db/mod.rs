//! Database operations for the sync service `PostgreSQL`.
//!
//! ## Tables
//!
//! - `tenants` - Registered store tenants (domain, credential, display name)
//! - `customers` - Synced customers, unique per `(tenant_id, external_id)`
//! - `products` - Synced products, unique per `(tenant_id, external_id)`
//! - `orders` - Synced orders, unique per `(tenant_id, external_id)`,
//!   referencing internal customer ids
//!
//! The composite uniqueness constraints are the storage-level backstop for
//! tenant isolation: every lookup and upsert in this module is keyed by
//! tenant id plus external id, never by external id alone.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tidesync-cli -- migrate
//! ```

pub mod analytics;
pub mod store;
pub mod tenants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use analytics::AnalyticsRepository;
pub use store::PgSyncStore;
pub use tenants::TenantRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate shop domain).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
