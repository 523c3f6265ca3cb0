//! Read-only analytics routes over a tenant's synced snapshot.
//!
//! The tenant is always taken from the path - there is no default tenant
//! and no way to reach another tenant's rows from these handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use tidesync_core::TenantId;

use crate::db::analytics::{RevenuePoint, TenantSummary, TopCustomer};
use crate::db::{AnalyticsRepository, TenantRepository};
use crate::error::AppError;
use crate::state::AppState;

/// Default and maximum sizes for the top-customers ranking.
const DEFAULT_TOP_LIMIT: i64 = 5;
const MAX_TOP_LIMIT: i64 = 100;

/// Build the analytics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/summary", get(summary))
        .route("/tenants/{tenant_id}/revenue", get(revenue))
        .route("/tenants/{tenant_id}/top-customers", get(top_customers))
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TopCustomersQuery {
    pub limit: Option<i64>,
}

/// Resolve the path tenant or fail with 404.
async fn require_tenant(state: &AppState, tenant_id: i32) -> Result<TenantId, AppError> {
    let repo = TenantRepository::new(state.pool());
    let tenant = repo
        .get_by_id(TenantId::new(tenant_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tenant {tenant_id}")))?;
    Ok(tenant.id)
}

/// GET /tenants/{id}/summary - aggregate totals for one tenant.
#[instrument(skip(state))]
async fn summary(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
) -> Result<Json<TenantSummary>, AppError> {
    let tenant_id = require_tenant(&state, tenant_id).await?;

    let repo = AnalyticsRepository::new(state.pool());
    Ok(Json(repo.summary(tenant_id).await?))
}

/// GET /tenants/{id}/revenue?start=YYYY-MM-DD&end=YYYY-MM-DD
///
/// Day-bucketed revenue series, both bounds inclusive.
#[instrument(skip(state))]
async fn revenue(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Vec<RevenuePoint>>, AppError> {
    let tenant_id = require_tenant(&state, tenant_id).await?;

    let (Some(start), Some(end)) = (query.start, query.end) else {
        return Err(AppError::BadRequest(
            "start and end date parameters required".to_owned(),
        ));
    };
    if end < start {
        return Err(AppError::BadRequest(
            "end date must not precede start date".to_owned(),
        ));
    }

    let repo = AnalyticsRepository::new(state.pool());
    Ok(Json(repo.revenue_by_day(tenant_id, start, end).await?))
}

/// GET /tenants/{id}/top-customers?limit=n - top-N customers by spend.
#[instrument(skip(state))]
async fn top_customers(
    State(state): State<AppState>,
    Path(tenant_id): Path<i32>,
    Query(query): Query<TopCustomersQuery>,
) -> Result<Json<Vec<TopCustomer>>, AppError> {
    let tenant_id = require_tenant(&state, tenant_id).await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .clamp(1, MAX_TOP_LIMIT);

    let repo = AnalyticsRepository::new(state.pool());
    Ok(Json(repo.top_customers(tenant_id, limit).await?))
}
