//! Bulk sync trigger route.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use tracing::instrument;

use tidesync_core::TenantId;

use crate::db::{PgSyncStore, TenantRepository};
use crate::error::AppError;
use crate::state::AppState;
use crate::sync::{Reconciler, SyncReport};

/// Build the sync router.
pub fn router() -> Router<AppState> {
    Router::new().route("/sync/{tenant_id}", post(trigger_sync))
}

/// POST /sync/{tenant_id} - run a full pull-and-merge for one tenant.
///
/// Returns the counts of rows ingested in this pass.
#[instrument(skip(state))]
async fn trigger_sync(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
) -> Result<Json<SyncReport>, AppError> {
    let store = PgSyncStore::new(state.pool());
    let tenants = TenantRepository::new(state.pool());
    let engine = Reconciler::new(
        &store,
        &tenants,
        state.remote(),
        &state.config().webhook_secret,
    );

    let report = engine.sync_tenant(TenantId::new(tenant_id)).await?;
    Ok(Json(report))
}
