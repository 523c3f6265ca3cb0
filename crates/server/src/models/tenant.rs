//! Tenant domain type.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use tidesync_core::{ShopDomain, TenantId};

/// A registered store tenant - the unit of data partitioning.
///
/// The access token is the tenant's Admin API credential. It is wrapped in
/// `SecretString` and only ever read by the remote fetch client; the Debug
/// impl redacts it so it cannot leak through logs.
#[derive(Clone)]
pub struct Tenant {
    /// Internal tenant ID.
    pub id: TenantId,
    /// The tenant's store domain (globally unique).
    pub shop_domain: ShopDomain,
    /// Admin API access token for this tenant's store.
    pub access_token: SecretString,
    /// Display name (defaults to the domain's first label at registration).
    pub display_name: String,
    /// When the tenant was registered.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}
