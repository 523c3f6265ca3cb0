//! Tenant management commands.

use secrecy::SecretString;

use tidesync_core::ShopDomain;
use tidesync_server::db::{self, TenantRepository};

use super::CommandError;

/// Register a store tenant.
///
/// The token is taken by value and moved straight into a `SecretString` so
/// it never sticks around as a plain string longer than necessary.
pub async fn register(
    domain: &str,
    token: String,
    name: Option<&str>,
) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let domain = ShopDomain::parse(domain)?;
    let access_token = SecretString::from(token);
    let display_name = name.unwrap_or_else(|| domain.first_label()).to_owned();

    let database_url = std::env::var("SYNC_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("SYNC_DATABASE_URL"))?;
    let pool = db::create_pool(&SecretString::from(database_url)).await?;

    let repo = TenantRepository::new(&pool);
    let tenant = repo.create(&domain, &access_token, &display_name).await?;

    tracing::info!(
        tenant_id = %tenant.id,
        shop = %tenant.shop_domain,
        "Tenant registered"
    );
    Ok(())
}
