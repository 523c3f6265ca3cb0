//! External-to-internal identity mapping.

use std::collections::HashMap;

use tidesync_core::{CustomerId, ExternalId, TenantId};

use super::gateway::SyncStore;
use crate::db::RepositoryError;

/// Maps a tenant's external customer ids to internal row ids.
///
/// Built by scanning the customers already persisted for one tenant, after
/// the customer pass of a bulk sync and before the order pass. The map is
/// rebuilt on every sync invocation, never cached across tenants or across
/// repeated syncs.
///
/// An absent mapping is not an error: it resolves to `None`, which becomes
/// a NULL customer reference on the order (guest checkout semantics).
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<ExternalId, CustomerId>,
}

impl IdentityMap {
    /// Build the map from the customers persisted for `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the scan fails.
    pub async fn load<S: SyncStore>(
        store: &S,
        tenant_id: TenantId,
    ) -> Result<Self, RepositoryError> {
        let pairs = store.customer_ids(tenant_id).await?;
        Ok(Self::from_pairs(pairs))
    }

    /// Build the map from explicit pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ExternalId, CustomerId)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Resolve an external customer id to its internal id, if persisted.
    #[must_use]
    pub fn resolve(&self, external_id: &ExternalId) -> Option<CustomerId> {
        self.entries.get(external_id).copied()
    }

    /// Number of mapped customers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
