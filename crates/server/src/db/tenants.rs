//! Tenant repository for database operations.
//!
//! This is the sync engine's tenant registry: the only component that reads
//! stored credentials for outbound calls.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use tidesync_core::{ShopDomain, TenantId};

use super::RepositoryError;
use crate::models::Tenant;
use crate::sync::gateway::TenantDirectory;

/// Raw row shape; converted into the validated [`Tenant`] domain type.
#[derive(sqlx::FromRow)]
struct TenantRow {
    id: i32,
    shop_domain: String,
    access_token: String,
    display_name: String,
    created_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self) -> Result<Tenant, RepositoryError> {
        let shop_domain = ShopDomain::parse(&self.shop_domain).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop domain in database: {e}"))
        })?;

        Ok(Tenant {
            id: TenantId::new(self.id),
            shop_domain,
            access_token: SecretString::from(self.access_token),
            display_name: self.display_name,
            created_at: self.created_at,
        })
    }
}

/// Repository for tenant database operations.
pub struct TenantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TenantRepository<'a> {
    /// Create a new tenant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a tenant by internal ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored domain is invalid.
    pub async fn get_by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            SELECT id, shop_domain, access_token, display_name, created_at
            FROM tenants
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TenantRow::into_tenant).transpose()
    }

    /// Get a tenant by store domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored domain is invalid.
    pub async fn get_by_domain(
        &self,
        domain: &ShopDomain,
    ) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            SELECT id, shop_domain, access_token, display_name, created_at
            FROM tenants
            WHERE shop_domain = $1
            ",
        )
        .bind(domain.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TenantRow::into_tenant).transpose()
    }

    /// Register a new tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the domain is already
    /// registered; the existing tenant is left untouched.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        domain: &ShopDomain,
        access_token: &SecretString,
        display_name: &str,
    ) -> Result<Tenant, RepositoryError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r"
            INSERT INTO tenants (shop_domain, access_token, display_name)
            VALUES ($1, $2, $3)
            RETURNING id, shop_domain, access_token, display_name, created_at
            ",
        )
        .bind(domain.as_str())
        .bind(access_token.expose_secret())
        .bind(display_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("shop domain already registered".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_tenant()
    }
}

impl TenantDirectory for TenantRepository<'_> {
    async fn by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn by_domain(&self, domain: &ShopDomain) -> Result<Option<Tenant>, RepositoryError> {
        self.get_by_domain(domain).await
    }

    async fn register(
        &self,
        domain: &ShopDomain,
        access_token: &SecretString,
        display_name: &str,
    ) -> Result<Tenant, RepositoryError> {
        self.create(domain, access_token, display_name).await
    }
}
