//! Manual bulk sync command.

use tidesync_core::TenantId;
use tidesync_server::config::ServerConfig;
use tidesync_server::db::{self, PgSyncStore, TenantRepository};
use tidesync_server::shopify::ShopifyRemote;
use tidesync_server::sync::Reconciler;

use super::CommandError;

/// Run a full pull-and-merge for one tenant, printing the ingest report.
pub async fn run(tenant_id: i32) -> Result<(), CommandError> {
    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    let store = PgSyncStore::new(&pool);
    let tenants = TenantRepository::new(&pool);
    let remote = ShopifyRemote::new(&config.shopify);
    let engine = Reconciler::new(&store, &tenants, &remote, &config.webhook_secret);

    let report = engine.sync_tenant(TenantId::new(tenant_id)).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
