//! Tenant registration route.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tidesync_core::{ShopDomain, TenantId};

use crate::db::TenantRepository;
use crate::error::AppError;
use crate::state::AppState;

/// Build the tenants router.
pub fn router() -> Router<AppState> {
    Router::new().route("/tenants/register", post(register))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// The store's domain (globally unique across tenants).
    pub shop_domain: String,
    /// Admin API access token for the store.
    pub access_token: String,
    /// Optional display name; defaults to the domain's first label.
    pub name: Option<String>,
}

/// The registered tenant. The access token is never echoed back.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: TenantId,
    pub shop_domain: ShopDomain,
    pub name: String,
}

/// POST /tenants/register - register a store tenant.
///
/// An invalid domain rejects with 400; a domain that is already registered
/// rejects with 409 and leaves the existing tenant's credential untouched.
#[instrument(skip(state, request))]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let domain = ShopDomain::parse(&request.shop_domain)
        .map_err(|e| AppError::BadRequest(format!("invalid shop domain: {e}")))?;

    if request.access_token.is_empty() {
        return Err(AppError::BadRequest("access_token is required".to_owned()));
    }

    let display_name = request
        .name
        .unwrap_or_else(|| domain.first_label().to_owned());
    let access_token = SecretString::from(request.access_token);

    let repo = TenantRepository::new(state.pool());
    let tenant = repo.create(&domain, &access_token, &display_name).await?;

    tracing::info!(tenant_id = %tenant.id, shop = %tenant.shop_domain, "tenant registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: tenant.id,
            shop_domain: tenant.shop_domain,
            name: tenant.display_name,
        }),
    ))
}
