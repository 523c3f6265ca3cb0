//! CLI command implementations.

pub mod migrate;
pub mod sync;
pub mod tenant;

use thiserror::Error;

use tidesync_core::ShopDomainError;
use tidesync_server::config::ConfigError;
use tidesync_server::db::RepositoryError;
use tidesync_server::sync::SyncError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid shop domain: {0}")]
    Domain(#[from] ShopDomainError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
