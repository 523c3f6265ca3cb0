//! Paginated Admin REST client and the per-tenant client factory.

use async_stream::try_stream;
use futures::Stream;
use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use tidesync_core::ShopDomain;

use crate::config::ShopifyConfig;
use crate::models::Tenant;
use crate::sync::gateway::{RemoteSource, RemoteSourceFactory};

use super::{FetchError, RemoteCustomer, RemoteOrder, RemoteProduct};

/// Header carrying the tenant's Admin API credential.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Page size for collection requests (Shopify's maximum).
const PAGE_LIMIT: &str = "250";

/// Fallback Retry-After when Shopify rate-limits without a usable header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

// Collection envelopes: every REST collection response wraps its records in
// a single field named after the resource.

#[derive(Deserialize)]
struct CustomerPage {
    customers: Vec<RemoteCustomer>,
}

#[derive(Deserialize)]
struct ProductPage {
    products: Vec<RemoteProduct>,
}

#[derive(Deserialize)]
struct OrderPage {
    orders: Vec<RemoteOrder>,
}

/// Shared factory for per-tenant Admin REST clients.
///
/// Owns the process-wide `reqwest::Client` (connection pool, bounded
/// timeout) and the configured API version; tenant credentials are supplied
/// per call via [`RemoteSourceFactory::for_tenant`].
#[derive(Clone)]
pub struct ShopifyRemote {
    http: reqwest::Client,
    api_version: String,
}

impl ShopifyRemote {
    /// Create the client factory.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_version: config.api_version.clone(),
        }
    }
}

impl RemoteSourceFactory for ShopifyRemote {
    type Source = AdminRestClient;

    fn for_tenant(&self, tenant: &Tenant) -> AdminRestClient {
        AdminRestClient::new(
            self.http.clone(),
            tenant.shop_domain.clone(),
            tenant.access_token.clone(),
            self.api_version.clone(),
        )
    }
}

/// Admin REST API client bound to one tenant's store and credential.
///
/// Collection methods return lazy streams: each call starts a fresh
/// pagination walk, and records are yielded as pages arrive.
pub struct AdminRestClient {
    http: reqwest::Client,
    shop_domain: ShopDomain,
    access_token: SecretString,
    api_version: String,
}

impl AdminRestClient {
    /// Create a client for one tenant.
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        shop_domain: ShopDomain,
        access_token: SecretString,
        api_version: String,
    ) -> Self {
        Self {
            http,
            shop_domain,
            access_token,
            api_version,
        }
    }

    /// Build the first-page URL for a collection.
    fn collection_url(
        &self,
        resource: &str,
        extra: &[(&str, &str)],
    ) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!(
            "https://{}/admin/api/{}/{resource}.json",
            self.shop_domain, self.api_version
        ))?;

        url.query_pairs_mut().append_pair("limit", PAGE_LIMIT);
        for (key, value) in extra {
            url.query_pairs_mut().append_pair(key, value);
        }

        Ok(url)
    }

    /// Fetch one page and the cursor URL for the next, if any.
    async fn fetch_page<P: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<(P, Option<Url>), FetchError> {
        tracing::debug!(shop = %self.shop_domain, %url, "fetching remote page");

        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(FetchError::RateLimited(retry_after));
        }
        if status.is_server_error() {
            return Err(FetchError::Transient(format!("remote returned {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Api(status.as_u16()));
        }

        let next = next_page_url(response.headers());
        let page = response
            .json::<P>()
            .await
            .map_err(FetchError::from_request)?;

        Ok((page, next))
    }

    /// Walk a paginated collection, yielding records as pages arrive.
    fn collection<'a, P, T>(
        &'a self,
        resource: &'static str,
        extra: &'static [(&'static str, &'static str)],
        extract: fn(P) -> Vec<T>,
    ) -> impl Stream<Item = Result<T, FetchError>> + Send + 'a
    where
        P: DeserializeOwned + Send + 'a,
        T: Send + 'static,
    {
        try_stream! {
            let mut next = Some(self.collection_url(resource, extra)?);
            while let Some(url) = next.take() {
                let (page, following) = self.fetch_page::<P>(url).await?;
                next = following;
                for record in extract(page) {
                    yield record;
                }
            }
        }
    }
}

impl RemoteSource for AdminRestClient {
    fn customers(&self) -> impl Stream<Item = Result<RemoteCustomer, FetchError>> + Send {
        self.collection("customers", &[], |page: CustomerPage| page.customers)
    }

    fn products(&self) -> impl Stream<Item = Result<RemoteProduct, FetchError>> + Send {
        self.collection("products", &[], |page: ProductPage| page.products)
    }

    fn orders(&self) -> impl Stream<Item = Result<RemoteOrder, FetchError>> + Send {
        // status=any: the snapshot includes closed and cancelled orders
        self.collection("orders", &[("status", "any")], |page: OrderPage| {
            page.orders
        })
    }
}

/// Extract the `rel="next"` cursor URL from a `Link` response header.
fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(header::LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        if !pieces.any(|param| param.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}
