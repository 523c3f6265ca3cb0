//! Contracts the reconciliation engine depends on.
//!
//! The engine never talks to `sqlx` or `reqwest` directly; it is generic
//! over these traits, constructed at the composition root with the real
//! implementations ([`crate::db::PgSyncStore`], [`crate::db::TenantRepository`],
//! [`crate::shopify::ShopifyRemote`]) and in tests with in-memory doubles.
//!
//! Every store operation takes the owning [`TenantId`] as a mandatory
//! parameter: omitting the tenant is a compile error, not a convention.

use futures::Stream;
use secrecy::SecretString;

use tidesync_core::{CustomerId, ExternalId, OrderId, ShopDomain, TenantId};

use crate::db::RepositoryError;
use crate::models::{CustomerRecord, OrderRecord, ProductRecord, Tenant};
use crate::shopify::{FetchError, RemoteCustomer, RemoteOrder, RemoteProduct};

/// Persistence gateway for synced records.
///
/// Implementations must make the keyed operations atomic at the storage
/// layer (conditional insert-or-update, not check-then-write), so that
/// concurrent deliveries for the same `(tenant, external id)` cannot race
/// into duplicate rows.
#[allow(async_fn_in_trait)]
pub trait SyncStore {
    /// Batch-insert customers, skipping rows whose `(tenant, external id)`
    /// already exists. Returns the number of rows actually inserted.
    async fn insert_customers(
        &self,
        tenant_id: TenantId,
        rows: &[CustomerRecord],
    ) -> Result<u64, RepositoryError>;

    /// Batch-insert products, skipping duplicates. Returns rows inserted.
    async fn insert_products(
        &self,
        tenant_id: TenantId,
        rows: &[ProductRecord],
    ) -> Result<u64, RepositoryError>;

    /// Batch-insert orders, skipping duplicates. Returns rows inserted.
    async fn insert_orders(
        &self,
        tenant_id: TenantId,
        rows: &[OrderRecord],
    ) -> Result<u64, RepositoryError>;

    /// Insert one order; `None` when this `(tenant, external id)` was
    /// already persisted (idempotent webhook redelivery).
    async fn insert_order(
        &self,
        tenant_id: TenantId,
        row: &OrderRecord,
    ) -> Result<Option<OrderId>, RepositoryError>;

    /// Point lookup of a customer's internal id.
    async fn find_customer(
        &self,
        tenant_id: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<CustomerId>, RepositoryError>;

    /// Insert-or-fetch with first-seen semantics: if the customer already
    /// exists its stored fields win and the existing id is returned.
    async fn ensure_customer(
        &self,
        tenant_id: TenantId,
        row: &CustomerRecord,
    ) -> Result<CustomerId, RepositoryError>;

    /// Insert-or-update with last-write-wins semantics on the mutable
    /// fields (email, names, total spent).
    async fn upsert_customer(
        &self,
        tenant_id: TenantId,
        row: &CustomerRecord,
    ) -> Result<CustomerId, RepositoryError>;

    /// All `(external id, internal id)` pairs persisted for a tenant.
    /// Feeds the per-invocation identity map rebuild.
    async fn customer_ids(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<(ExternalId, CustomerId)>, RepositoryError>;
}

/// Tenant registry: the engine's sole authority for resolving who it is
/// talking to. No other component stores or forwards credentials.
#[allow(async_fn_in_trait)]
pub trait TenantDirectory {
    /// Look up a tenant by internal id.
    async fn by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError>;

    /// Look up a tenant by store domain.
    async fn by_domain(&self, domain: &ShopDomain) -> Result<Option<Tenant>, RepositoryError>;

    /// Register a new tenant.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when the domain is already
    /// registered; the existing tenant's credential is left untouched.
    async fn register(
        &self,
        domain: &ShopDomain,
        access_token: &SecretString,
        display_name: &str,
    ) -> Result<Tenant, RepositoryError>;
}

/// A tenant's remote collections as lazy, restartable streams.
///
/// Each method starts a fresh pagination walk over current remote state;
/// nothing is cached between calls.
pub trait RemoteSource {
    fn customers(&self) -> impl Stream<Item = Result<RemoteCustomer, FetchError>> + Send;
    fn products(&self) -> impl Stream<Item = Result<RemoteProduct, FetchError>> + Send;
    fn orders(&self) -> impl Stream<Item = Result<RemoteOrder, FetchError>> + Send;
}

/// Builds a [`RemoteSource`] bound to one tenant's store and credential.
pub trait RemoteSourceFactory {
    type Source: RemoteSource;

    fn for_tenant(&self, tenant: &Tenant) -> Self::Source;
}
