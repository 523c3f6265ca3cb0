//! HTTP route handlers for the sync service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database)
//!
//! # Sync
//! POST /sync/{tenant_id}            - Trigger a bulk sync for a tenant
//!
//! # Webhooks
//! POST /webhooks/shopify            - Inbound Shopify webhook deliveries
//!
//! # Tenants
//! POST /tenants/register            - Register a store tenant
//!
//! # Analytics (read-only, tenant-scoped)
//! GET  /tenants/{id}/summary        - Aggregate totals
//! GET  /tenants/{id}/revenue        - Day-bucketed revenue series
//! GET  /tenants/{id}/top-customers  - Top-N customers by spend
//! ```

pub mod analytics;
pub mod sync;
pub mod tenants;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Create all routes for the sync service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(sync::router())
        .merge(webhooks::router())
        .merge(tenants::router())
        .merge(analytics::router())
}
