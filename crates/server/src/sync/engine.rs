//! The reconciliation engine: bulk sync and single-event apply.

use futures::{Stream, TryStreamExt, pin_mut};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Serialize;
use tracing::instrument;

use tidesync_core::{CustomerId, ExternalId, OrderId, ShopDomain, TenantId};

use crate::models::{CustomerRecord, OrderRecord, ProductRecord};
use crate::shopify::{FetchError, RemoteCustomer, RemoteOrder, RemoteProduct};

use super::SyncError;
use super::gateway::{RemoteSource, RemoteSourceFactory, SyncStore, TenantDirectory};
use super::identity::IdentityMap;
use super::webhook::{self, WebhookTopic};

/// Counts of rows ingested by one bulk sync pass.
///
/// These are rows actually inserted, not rows fetched: a re-run against an
/// unchanged remote reports zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub customers: u64,
    pub products: u64,
    pub orders: u64,
}

/// What a webhook delivery did to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// An order row was created, with its resolved customer reference.
    OrderCreated {
        order: OrderId,
        customer: Option<CustomerId>,
    },
    /// The order was already persisted; redelivery changed nothing.
    OrderAlreadySeen,
    /// A customer row was created or overwritten.
    CustomerUpserted { customer: CustomerId },
    /// The topic has no handler; acknowledged without persistence effect.
    Ignored { topic: String },
}

/// Orchestrates bulk syncs and webhook applies for any tenant.
///
/// Constructed at the composition root with its dependencies injected; holds
/// no state of its own, so one instance per request is fine. Concurrent
/// invocations - for different tenants or the same one - are safe because
/// every keyed write is atomic at the storage layer.
pub struct Reconciler<'a, S, D, R> {
    store: &'a S,
    tenants: &'a D,
    remote: &'a R,
    webhook_secret: &'a SecretString,
}

impl<'a, S, D, R> Reconciler<'a, S, D, R>
where
    S: SyncStore,
    D: TenantDirectory,
    R: RemoteSourceFactory,
{
    /// Create an engine over the given store, registry, and remote factory.
    #[must_use]
    pub const fn new(
        store: &'a S,
        tenants: &'a D,
        remote: &'a R,
        webhook_secret: &'a SecretString,
    ) -> Self {
        Self {
            store,
            tenants,
            remote,
            webhook_secret,
        }
    }

    /// Run a full pull-and-merge of one tenant's remote collections.
    ///
    /// Collections are processed in dependency order: customers and products
    /// first, then the identity map rebuild, then orders. If a fetch step
    /// fails the sync aborts and reports the error; collections already
    /// inserted by earlier steps of the same call remain persisted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TenantNotFound`] for an unregistered tenant,
    /// [`SyncError::Fetch`] when a remote pull fails, and
    /// [`SyncError::Store`] when persistence fails.
    #[instrument(skip(self))]
    pub async fn sync_tenant(&self, tenant_id: TenantId) -> Result<SyncReport, SyncError> {
        let tenant = self
            .tenants
            .by_id(tenant_id)
            .await?
            .ok_or_else(|| SyncError::TenantNotFound(format!("tenant {tenant_id}")))?;
        let source = self.remote.for_tenant(&tenant);

        tracing::info!(shop = %tenant.shop_domain, "starting bulk sync");

        let rows = collect(source.customers(), customer_record).await?;
        let customers = self.store.insert_customers(tenant.id, &rows).await?;
        tracing::info!(shop = %tenant.shop_domain, fetched = rows.len(), inserted = customers, "customers synced");

        let rows = collect(source.products(), product_record).await?;
        let products = self.store.insert_products(tenant.id, &rows).await?;
        tracing::info!(shop = %tenant.shop_domain, fetched = rows.len(), inserted = products, "products synced");

        // The order pass depends on the customer pass being persisted:
        // rebuild the identity map from the store, not from what was fetched.
        let identity = IdentityMap::load(self.store, tenant.id).await?;

        let rows = collect(source.orders(), |order| order_record(order, &identity)).await?;
        let orders = self.store.insert_orders(tenant.id, &rows).await?;
        tracing::info!(shop = %tenant.shop_domain, fetched = rows.len(), inserted = orders, "orders synced");

        Ok(SyncReport {
            customers,
            products,
            orders,
        })
    }

    /// Apply one webhook delivery.
    ///
    /// The signature is verified over the raw body bytes before anything
    /// else happens; an invalid signature or an unregistered domain is a
    /// terminal rejection with zero writes. Redelivery of an already-applied
    /// event is a no-op, so non-2xx retries from the sender are safe.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SignatureRejected`] on HMAC mismatch,
    /// [`SyncError::TenantNotFound`] for an unknown domain,
    /// [`SyncError::InvalidPayload`] for malformed JSON, and
    /// [`SyncError::Store`] when persistence fails.
    #[instrument(skip(self, body, signature))]
    pub async fn apply_event(
        &self,
        topic: &WebhookTopic,
        shop_domain: &str,
        body: &[u8],
        signature: &str,
    ) -> Result<EventOutcome, SyncError> {
        if !webhook::verify_signature(self.webhook_secret, body, signature) {
            return Err(SyncError::SignatureRejected);
        }

        let domain = ShopDomain::parse(shop_domain)
            .map_err(|e| SyncError::InvalidPayload(format!("invalid shop domain: {e}")))?;
        let tenant = self
            .tenants
            .by_domain(&domain)
            .await?
            .ok_or_else(|| SyncError::TenantNotFound(domain.to_string()))?;

        match topic {
            WebhookTopic::OrdersCreate => {
                let order: RemoteOrder = parse_payload(body)?;
                self.apply_order_created(tenant.id, order).await
            }
            WebhookTopic::CustomersCreate => {
                let customer: RemoteCustomer = parse_payload(body)?;
                let customer_id = self
                    .store
                    .upsert_customer(tenant.id, &customer_record(customer))
                    .await?;
                tracing::info!(shop = %tenant.shop_domain, %customer_id, "customer upserted");
                Ok(EventOutcome::CustomerUpserted {
                    customer: customer_id,
                })
            }
            WebhookTopic::Other(topic) => {
                tracing::info!(shop = %tenant.shop_domain, topic, "unhandled webhook topic");
                Ok(EventOutcome::Ignored {
                    topic: topic.clone(),
                })
            }
        }
    }

    /// Ingest one pushed order, creating its customer first if needed.
    async fn apply_order_created(
        &self,
        tenant_id: TenantId,
        order: RemoteOrder,
    ) -> Result<EventOutcome, SyncError> {
        // First-seen semantics: the order's embedded snapshot becomes the
        // initial customer row; an existing row's fields win.
        let customer_id = match &order.customer {
            Some(customer) => Some(
                self.store
                    .ensure_customer(tenant_id, &customer_record(customer.clone()))
                    .await?,
            ),
            None => None,
        };

        let record = OrderRecord {
            external_id: ExternalId::from_remote(order.id),
            customer_id,
            total_price: order.total_price.unwrap_or(Decimal::ZERO),
            currency: order.currency,
            placed_at: order.created_at,
        };

        match self.store.insert_order(tenant_id, &record).await? {
            Some(order_id) => {
                tracing::info!(%tenant_id, %order_id, "order ingested");
                Ok(EventOutcome::OrderCreated {
                    order: order_id,
                    customer: customer_id,
                })
            }
            None => {
                tracing::debug!(%tenant_id, external_id = %record.external_id, "order already seen");
                Ok(EventOutcome::OrderAlreadySeen)
            }
        }
    }
}

/// Drain a fetch stream into transformed insert records.
async fn collect<T, U>(
    stream: impl Stream<Item = Result<T, FetchError>> + Send,
    mut transform: impl FnMut(T) -> U,
) -> Result<Vec<U>, FetchError> {
    pin_mut!(stream);
    let mut rows = Vec::new();
    while let Some(item) = stream.try_next().await? {
        rows.push(transform(item));
    }
    Ok(rows)
}

fn parse_payload<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, SyncError> {
    serde_json::from_slice(body).map_err(|e| SyncError::InvalidPayload(e.to_string()))
}

// =============================================================================
// Transforms: wire shapes -> insert records
// =============================================================================

fn customer_record(remote: RemoteCustomer) -> CustomerRecord {
    CustomerRecord {
        external_id: ExternalId::from_remote(remote.id),
        email: remote.email,
        first_name: remote.first_name,
        last_name: remote.last_name,
        total_spent: remote.total_spent.unwrap_or(Decimal::ZERO),
    }
}

fn product_record(remote: RemoteProduct) -> ProductRecord {
    let price = remote
        .variants
        .first()
        .and_then(|variant| variant.price)
        .unwrap_or(Decimal::ZERO);

    ProductRecord {
        external_id: ExternalId::from_remote(remote.id),
        title: remote.title,
        price,
    }
}

fn order_record(remote: RemoteOrder, identity: &IdentityMap) -> OrderRecord {
    let customer_id = remote
        .customer
        .as_ref()
        .and_then(|customer| identity.resolve(&ExternalId::from_remote(customer.id)));

    OrderRecord {
        external_id: ExternalId::from_remote(remote.id),
        customer_id,
        total_price: remote.total_price.unwrap_or(Decimal::ZERO),
        currency: remote.currency,
        placed_at: remote.created_at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use sha2::Sha256;

    use crate::db::RepositoryError;
    use crate::models::Tenant;
    use crate::shopify::RemoteVariant;
    use tidesync_core::ProductId;

    use super::*;

    const WEBHOOK_SECRET: &str = "wh_9f8e7d6c5b4a3210";

    fn secret() -> SecretString {
        SecretString::from(WEBHOOK_SECRET)
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn tenant(id: i32, domain: &str) -> Tenant {
        Tenant {
            id: TenantId::new(id),
            shop_domain: ShopDomain::parse(domain).unwrap(),
            access_token: SecretString::from("shpat_test_token"),
            display_name: domain.split('.').next().unwrap_or("shop").to_owned(),
            created_at: Utc::now(),
        }
    }

    fn remote_customer(id: i64, email: &str, spent: &str) -> RemoteCustomer {
        RemoteCustomer {
            id,
            email: Some(email.to_owned()),
            first_name: None,
            last_name: None,
            total_spent: Some(spent.parse().unwrap()),
        }
    }

    fn remote_product(id: i64, title: &str, price: &str) -> RemoteProduct {
        RemoteProduct {
            id,
            title: title.to_owned(),
            variants: vec![RemoteVariant {
                price: Some(price.parse().unwrap()),
            }],
        }
    }

    fn remote_order(id: i64, customer: Option<RemoteCustomer>, total: &str) -> RemoteOrder {
        RemoteOrder {
            id,
            customer,
            total_price: Some(total.parse().unwrap()),
            currency: "USD".to_owned(),
            created_at: Utc::now(),
        }
    }

    // =========================================================================
    // In-memory doubles
    // =========================================================================

    #[derive(Default)]
    struct MemStore {
        customers: Mutex<Vec<(TenantId, CustomerId, CustomerRecord)>>,
        products: Mutex<Vec<(TenantId, ProductId, ProductRecord)>>,
        orders: Mutex<Vec<(TenantId, OrderId, OrderRecord)>>,
        next_id: AtomicI32,
    }

    impl MemStore {
        fn next(&self) -> i32 {
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        }

        fn customer_row(
            &self,
            tenant_id: TenantId,
            external_id: &str,
        ) -> Option<(CustomerId, CustomerRecord)> {
            self.customers
                .lock()
                .unwrap()
                .iter()
                .find(|(t, _, r)| *t == tenant_id && r.external_id.as_str() == external_id)
                .map(|(_, id, r)| (*id, r.clone()))
        }

        fn orders_for(&self, tenant_id: TenantId) -> Vec<(OrderId, OrderRecord)> {
            self.orders
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _, _)| *t == tenant_id)
                .map(|(_, id, r)| (*id, r.clone()))
                .collect()
        }

        fn row_counts(&self) -> (usize, usize, usize) {
            (
                self.customers.lock().unwrap().len(),
                self.products.lock().unwrap().len(),
                self.orders.lock().unwrap().len(),
            )
        }
    }

    impl SyncStore for MemStore {
        async fn insert_customers(
            &self,
            tenant_id: TenantId,
            rows: &[CustomerRecord],
        ) -> Result<u64, RepositoryError> {
            let mut customers = self.customers.lock().unwrap();
            let mut inserted = 0;
            for row in rows {
                let exists = customers
                    .iter()
                    .any(|(t, _, r)| *t == tenant_id && r.external_id == row.external_id);
                if !exists {
                    customers.push((tenant_id, CustomerId::new(self.next()), row.clone()));
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn insert_products(
            &self,
            tenant_id: TenantId,
            rows: &[ProductRecord],
        ) -> Result<u64, RepositoryError> {
            let mut products = self.products.lock().unwrap();
            let mut inserted = 0;
            for row in rows {
                let exists = products
                    .iter()
                    .any(|(t, _, r)| *t == tenant_id && r.external_id == row.external_id);
                if !exists {
                    products.push((tenant_id, ProductId::new(self.next()), row.clone()));
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn insert_orders(
            &self,
            tenant_id: TenantId,
            rows: &[OrderRecord],
        ) -> Result<u64, RepositoryError> {
            let mut inserted = 0;
            for row in rows {
                if self.insert_order(tenant_id, row).await?.is_some() {
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn insert_order(
            &self,
            tenant_id: TenantId,
            row: &OrderRecord,
        ) -> Result<Option<OrderId>, RepositoryError> {
            let mut orders = self.orders.lock().unwrap();
            let exists = orders
                .iter()
                .any(|(t, _, r)| *t == tenant_id && r.external_id == row.external_id);
            if exists {
                return Ok(None);
            }
            let id = OrderId::new(self.next());
            orders.push((tenant_id, id, row.clone()));
            Ok(Some(id))
        }

        async fn find_customer(
            &self,
            tenant_id: TenantId,
            external_id: &ExternalId,
        ) -> Result<Option<CustomerId>, RepositoryError> {
            Ok(self
                .customer_row(tenant_id, external_id.as_str())
                .map(|(id, _)| id))
        }

        async fn ensure_customer(
            &self,
            tenant_id: TenantId,
            row: &CustomerRecord,
        ) -> Result<CustomerId, RepositoryError> {
            let mut customers = self.customers.lock().unwrap();
            if let Some((_, id, _)) = customers
                .iter()
                .find(|(t, _, r)| *t == tenant_id && r.external_id == row.external_id)
            {
                return Ok(*id);
            }
            let id = CustomerId::new(self.next());
            customers.push((tenant_id, id, row.clone()));
            Ok(id)
        }

        async fn upsert_customer(
            &self,
            tenant_id: TenantId,
            row: &CustomerRecord,
        ) -> Result<CustomerId, RepositoryError> {
            let mut customers = self.customers.lock().unwrap();
            if let Some((_, id, existing)) = customers
                .iter_mut()
                .find(|(t, _, r)| *t == tenant_id && r.external_id == row.external_id)
            {
                existing.email = row.email.clone();
                existing.first_name = row.first_name.clone();
                existing.last_name = row.last_name.clone();
                existing.total_spent = row.total_spent;
                return Ok(*id);
            }
            let id = CustomerId::new(self.next());
            customers.push((tenant_id, id, row.clone()));
            Ok(id)
        }

        async fn customer_ids(
            &self,
            tenant_id: TenantId,
        ) -> Result<Vec<(ExternalId, CustomerId)>, RepositoryError> {
            Ok(self
                .customers
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _, _)| *t == tenant_id)
                .map(|(_, id, r)| (r.external_id.clone(), *id))
                .collect())
        }
    }

    #[derive(Default)]
    struct MemDirectory {
        tenants: Mutex<Vec<Tenant>>,
    }

    impl MemDirectory {
        fn with(tenants: Vec<Tenant>) -> Self {
            Self {
                tenants: Mutex::new(tenants),
            }
        }
    }

    impl TenantDirectory for MemDirectory {
        async fn by_id(&self, id: TenantId) -> Result<Option<Tenant>, RepositoryError> {
            Ok(self
                .tenants
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id)
                .cloned())
        }

        async fn by_domain(
            &self,
            domain: &ShopDomain,
        ) -> Result<Option<Tenant>, RepositoryError> {
            Ok(self
                .tenants
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.shop_domain == *domain)
                .cloned())
        }

        async fn register(
            &self,
            domain: &ShopDomain,
            access_token: &SecretString,
            display_name: &str,
        ) -> Result<Tenant, RepositoryError> {
            let mut tenants = self.tenants.lock().unwrap();
            if tenants.iter().any(|t| t.shop_domain == *domain) {
                return Err(RepositoryError::Conflict(
                    "shop domain already registered".to_owned(),
                ));
            }
            let registered = Tenant {
                id: TenantId::new(i32::try_from(tenants.len()).unwrap() + 1),
                shop_domain: domain.clone(),
                access_token: access_token.clone(),
                display_name: display_name.to_owned(),
                created_at: Utc::now(),
            };
            tenants.push(registered.clone());
            Ok(registered)
        }
    }

    #[derive(Clone, Default)]
    struct FixtureSource {
        customers: Vec<RemoteCustomer>,
        products: Vec<RemoteProduct>,
        orders: Vec<RemoteOrder>,
        fail_products: bool,
    }

    impl RemoteSource for FixtureSource {
        fn customers(&self) -> impl Stream<Item = Result<RemoteCustomer, FetchError>> + Send {
            futures::stream::iter(
                self.customers
                    .clone()
                    .into_iter()
                    .map(Ok)
                    .collect::<Vec<_>>(),
            )
        }

        fn products(&self) -> impl Stream<Item = Result<RemoteProduct, FetchError>> + Send {
            let items: Vec<Result<RemoteProduct, FetchError>> = if self.fail_products {
                vec![Err(FetchError::Transient("connection reset".to_owned()))]
            } else {
                self.products.clone().into_iter().map(Ok).collect()
            };
            futures::stream::iter(items)
        }

        fn orders(&self) -> impl Stream<Item = Result<RemoteOrder, FetchError>> + Send {
            futures::stream::iter(self.orders.clone().into_iter().map(Ok).collect::<Vec<_>>())
        }
    }

    #[derive(Clone, Default)]
    struct FixtureRemote(FixtureSource);

    impl RemoteSourceFactory for FixtureRemote {
        type Source = FixtureSource;

        fn for_tenant(&self, _tenant: &Tenant) -> FixtureSource {
            self.0.clone()
        }
    }

    // =========================================================================
    // Bulk sync
    // =========================================================================

    #[tokio::test]
    async fn test_sync_reports_counts_and_resolves_customer_reference() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote(FixtureSource {
            customers: vec![
                remote_customer(201, "ana@example.com", "10.00"),
                remote_customer(202, "ben@example.com", "20.00"),
                remote_customer(203, "cho@example.com", "30.00"),
            ],
            products: vec![
                remote_product(501, "Board", "350.00"),
                remote_product(502, "Wax", "12.50"),
            ],
            orders: vec![remote_order(
                901,
                Some(remote_customer(202, "ben@example.com", "20.00")),
                "89.00",
            )],
            ..FixtureSource::default()
        });
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let report = engine.sync_tenant(TenantId::new(1)).await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                customers: 3,
                products: 2,
                orders: 1
            }
        );

        // The order's reference is the second customer's *internal* id
        let (ben_id, _) = store.customer_row(TenantId::new(1), "202").unwrap();
        let orders = store.orders_for(TenantId::new(1));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders.first().unwrap().1.customer_id, Some(ben_id));
    }

    #[tokio::test]
    async fn test_sync_twice_inserts_nothing_new() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote(FixtureSource {
            customers: vec![remote_customer(201, "ana@example.com", "10.00")],
            products: vec![remote_product(501, "Board", "350.00")],
            orders: vec![remote_order(901, None, "89.00")],
            ..FixtureSource::default()
        });
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let first = engine.sync_tenant(TenantId::new(1)).await.unwrap();
        let counts_after_first = store.row_counts();

        let second = engine.sync_tenant(TenantId::new(1)).await.unwrap();

        assert_eq!(
            first,
            SyncReport {
                customers: 1,
                products: 1,
                orders: 1
            }
        );
        assert_eq!(
            second,
            SyncReport {
                customers: 0,
                products: 0,
                orders: 0
            }
        );
        assert_eq!(store.row_counts(), counts_after_first);
    }

    #[tokio::test]
    async fn test_sync_missing_totals_default_to_zero() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote(FixtureSource {
            customers: vec![RemoteCustomer {
                id: 201,
                email: None,
                first_name: None,
                last_name: None,
                total_spent: None,
            }],
            products: vec![RemoteProduct {
                id: 501,
                title: "Gift Card".to_owned(),
                variants: Vec::new(),
            }],
            ..FixtureSource::default()
        });
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        engine.sync_tenant(TenantId::new(1)).await.unwrap();

        let (_, customer) = store.customer_row(TenantId::new(1), "201").unwrap();
        assert_eq!(customer.total_spent, Decimal::ZERO);

        let products = store.products.lock().unwrap();
        assert_eq!(products.first().unwrap().2.price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_sync_unknown_tenant_is_rejected() {
        let store = MemStore::default();
        let directory = MemDirectory::default();
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let err = engine.sync_tenant(TenantId::new(99)).await.unwrap_err();
        assert!(matches!(err, SyncError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn test_sync_aborts_on_fetch_failure_keeping_earlier_steps() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote(FixtureSource {
            customers: vec![remote_customer(201, "ana@example.com", "10.00")],
            orders: vec![remote_order(901, None, "89.00")],
            fail_products: true,
            ..FixtureSource::default()
        });
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let err = engine.sync_tenant(TenantId::new(1)).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(FetchError::Transient(_))));

        // The customer pass already committed; the order pass never ran
        assert_eq!(store.row_counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_same_external_id_under_two_tenants_stays_isolated() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![
            tenant(1, "acme.myshopify.com"),
            tenant(2, "blue.myshopify.com"),
        ]);
        let remote = FixtureRemote(FixtureSource {
            customers: vec![remote_customer(201, "ana@example.com", "10.00")],
            ..FixtureSource::default()
        });
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        engine.sync_tenant(TenantId::new(1)).await.unwrap();
        engine.sync_tenant(TenantId::new(2)).await.unwrap();

        let (id_a, _) = store.customer_row(TenantId::new(1), "201").unwrap();
        let (id_b, _) = store.customer_row(TenantId::new(2), "201").unwrap();
        assert_ne!(id_a, id_b);

        // An upsert under tenant 2 must not touch tenant 1's row
        let body = json!({
            "id": 201,
            "email": "updated@example.com",
            "total_spent": "99.00"
        })
        .to_string()
        .into_bytes();
        engine
            .apply_event(
                &WebhookTopic::CustomersCreate,
                "blue.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap();

        let (_, row_a) = store.customer_row(TenantId::new(1), "201").unwrap();
        let (_, row_b) = store.customer_row(TenantId::new(2), "201").unwrap();
        assert_eq!(row_a.email.as_deref(), Some("ana@example.com"));
        assert_eq!(row_b.email.as_deref(), Some("updated@example.com"));
    }

    // =========================================================================
    // Event apply
    // =========================================================================

    #[tokio::test]
    async fn test_customers_create_twice_is_last_write_wins() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let first = json!({"id": 301, "email": "old@example.com", "total_spent": "5.00"})
            .to_string()
            .into_bytes();
        let second = json!({"id": 301, "email": "new@example.com", "total_spent": "25.00"})
            .to_string()
            .into_bytes();

        engine
            .apply_event(
                &WebhookTopic::CustomersCreate,
                "acme.myshopify.com",
                &first,
                &sign(&first),
            )
            .await
            .unwrap();
        engine
            .apply_event(
                &WebhookTopic::CustomersCreate,
                "acme.myshopify.com",
                &second,
                &sign(&second),
            )
            .await
            .unwrap();

        assert_eq!(store.row_counts().0, 1);
        let (_, row) = store.customer_row(TenantId::new(1), "301").unwrap();
        assert_eq!(row.email.as_deref(), Some("new@example.com"));
        assert_eq!(row.total_spent, "25.00".parse().unwrap());
    }

    #[tokio::test]
    async fn test_orders_create_without_customer_gets_null_reference() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let body = json!({
            "id": 901,
            "total_price": "42.00",
            "currency": "USD",
            "created_at": "2026-03-14T09:30:00Z"
        })
        .to_string()
        .into_bytes();

        let outcome = engine
            .apply_event(
                &WebhookTopic::OrdersCreate,
                "acme.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            EventOutcome::OrderCreated { customer: None, .. }
        ));
        let orders = store.orders_for(TenantId::new(1));
        assert_eq!(orders.first().unwrap().1.customer_id, None);
    }

    #[tokio::test]
    async fn test_orders_create_creates_customer_first_seen() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let body = json!({
            "id": 902,
            "customer": {"id": 301, "email": "kai@example.com", "total_spent": "0.00"},
            "total_price": "59.00",
            "currency": "USD",
            "created_at": "2026-03-14T09:30:00Z"
        })
        .to_string()
        .into_bytes();

        let outcome = engine
            .apply_event(
                &WebhookTopic::OrdersCreate,
                "acme.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap();

        // The embedded snapshot became the initial customer row
        let (customer_id, row) = store.customer_row(TenantId::new(1), "301").unwrap();
        assert_eq!(row.email.as_deref(), Some("kai@example.com"));
        assert_eq!(
            outcome,
            EventOutcome::OrderCreated {
                order: store.orders_for(TenantId::new(1)).first().unwrap().0,
                customer: Some(customer_id),
            }
        );

        // Redelivery of the same event changes nothing
        let redelivery = engine
            .apply_event(
                &WebhookTopic::OrdersCreate,
                "acme.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap();
        assert_eq!(redelivery, EventOutcome::OrderAlreadySeen);
        assert_eq!(store.row_counts(), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_tampered_signature_rejected_with_zero_writes() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let signed_body = json!({"id": 301, "total_spent": "5.00"}).to_string();
        let tampered_body = json!({"id": 301, "total_spent": "5000.00"})
            .to_string()
            .into_bytes();

        let err = engine
            .apply_event(
                &WebhookTopic::CustomersCreate,
                "acme.myshopify.com",
                &tampered_body,
                &sign(signed_body.as_bytes()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SignatureRejected));
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_unknown_domain_is_rejected() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let body = json!({"id": 301}).to_string().into_bytes();
        let err = engine
            .apply_event(
                &WebhookTopic::CustomersCreate,
                "stranger.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::TenantNotFound(_)));
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_unknown_topic_is_acknowledged_noop() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let body = json!({"id": 1}).to_string().into_bytes();
        let outcome = engine
            .apply_event(
                &WebhookTopic::from("refunds/create"),
                "acme.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Ignored {
                topic: "refunds/create".to_owned()
            }
        );
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_malformed_payload_rejected_with_zero_writes() {
        let store = MemStore::default();
        let directory = MemDirectory::with(vec![tenant(1, "acme.myshopify.com")]);
        let remote = FixtureRemote::default();
        let secret = secret();
        let engine = Reconciler::new(&store, &directory, &remote, &secret);

        let body = b"not json at all".to_vec();
        let err = engine
            .apply_event(
                &WebhookTopic::OrdersCreate,
                "acme.myshopify.com",
                &body,
                &sign(&body),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidPayload(_)));
        assert_eq!(store.row_counts(), (0, 0, 0));
    }

    // =========================================================================
    // Tenant registry contract
    // =========================================================================

    #[tokio::test]
    async fn test_duplicate_registration_conflicts_and_preserves_credential() {
        let directory = MemDirectory::default();
        let domain = ShopDomain::parse("a.myshop.com").unwrap();

        let registered = directory
            .register(&domain, &SecretString::from("shpat_original"), "a")
            .await
            .unwrap();

        let err = directory
            .register(&domain, &SecretString::from("shpat_other"), "a")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = directory.by_id(registered.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token.expose_secret(), "shpat_original");
    }
}
