//! `PostgreSQL` implementation of the persistence gateway.
//!
//! Uniqueness of `(tenant_id, external_id)` is enforced by composite
//! constraints in the schema; every conditional write here is a single SQL
//! statement (`ON CONFLICT`), so concurrent deliveries for the same key
//! resolve at the row level instead of racing in application code.

use sqlx::{PgPool, QueryBuilder, Row};

use tidesync_core::{CustomerId, ExternalId, OrderId, TenantId};

use crate::models::{CustomerRecord, OrderRecord, ProductRecord};
use crate::sync::gateway::SyncStore;

use super::RepositoryError;

/// Rows per batch insert, kept well under the Postgres bind limit.
const INSERT_CHUNK: usize = 1_000;

/// Persistence gateway backed by `PostgreSQL`.
pub struct PgSyncStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSyncStore<'a> {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl SyncStore for PgSyncStore<'_> {
    async fn insert_customers(
        &self,
        tenant_id: TenantId,
        rows: &[CustomerRecord],
    ) -> Result<u64, RepositoryError> {
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO customers (tenant_id, external_id, email, first_name, last_name, total_spent) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(tenant_id.as_i32())
                    .push_bind(row.external_id.as_str())
                    .push_bind(row.email.as_deref())
                    .push_bind(row.first_name.as_deref())
                    .push_bind(row.last_name.as_deref())
                    .push_bind(row.total_spent);
            });
            builder.push(" ON CONFLICT (tenant_id, external_id) DO NOTHING");

            inserted += builder.build().execute(self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_products(
        &self,
        tenant_id: TenantId,
        rows: &[ProductRecord],
    ) -> Result<u64, RepositoryError> {
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO products (tenant_id, external_id, title, price) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(tenant_id.as_i32())
                    .push_bind(row.external_id.as_str())
                    .push_bind(row.title.as_str())
                    .push_bind(row.price);
            });
            builder.push(" ON CONFLICT (tenant_id, external_id) DO NOTHING");

            inserted += builder.build().execute(self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_orders(
        &self,
        tenant_id: TenantId,
        rows: &[OrderRecord],
    ) -> Result<u64, RepositoryError> {
        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO orders (tenant_id, external_id, customer_id, total_price, currency, placed_at) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(tenant_id.as_i32())
                    .push_bind(row.external_id.as_str())
                    .push_bind(row.customer_id.map(|id| id.as_i32()))
                    .push_bind(row.total_price)
                    .push_bind(row.currency.as_str())
                    .push_bind(row.placed_at);
            });
            builder.push(" ON CONFLICT (tenant_id, external_id) DO NOTHING");

            inserted += builder.build().execute(self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_order(
        &self,
        tenant_id: TenantId,
        row: &OrderRecord,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let inserted = sqlx::query(
            r"
            INSERT INTO orders (tenant_id, external_id, customer_id, total_price, currency, placed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, external_id) DO NOTHING
            RETURNING id
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(row.external_id.as_str())
        .bind(row.customer_id.map(|id| id.as_i32()))
        .bind(row.total_price)
        .bind(row.currency.as_str())
        .bind(row.placed_at)
        .fetch_optional(self.pool)
        .await?;

        match inserted {
            Some(r) => Ok(Some(OrderId::new(r.try_get("id")?))),
            None => Ok(None),
        }
    }

    async fn find_customer(
        &self,
        tenant_id: TenantId,
        external_id: &ExternalId,
    ) -> Result<Option<CustomerId>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id
            FROM customers
            WHERE tenant_id = $1 AND external_id = $2
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(external_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(CustomerId::new(r.try_get("id")?))),
            None => Ok(None),
        }
    }

    async fn ensure_customer(
        &self,
        tenant_id: TenantId,
        row: &CustomerRecord,
    ) -> Result<CustomerId, RepositoryError> {
        // Insert-or-fetch in one statement: the existing row wins and its id
        // comes back either way.
        let result = sqlx::query(
            r"
            WITH new_row AS (
                INSERT INTO customers (tenant_id, external_id, email, first_name, last_name, total_spent)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (tenant_id, external_id) DO NOTHING
                RETURNING id
            )
            SELECT id FROM new_row
            UNION ALL
            SELECT id FROM customers WHERE tenant_id = $1 AND external_id = $2
            LIMIT 1
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(row.external_id.as_str())
        .bind(row.email.as_deref())
        .bind(row.first_name.as_deref())
        .bind(row.last_name.as_deref())
        .bind(row.total_spent)
        .fetch_one(self.pool)
        .await?;

        Ok(CustomerId::new(result.try_get("id")?))
    }

    async fn upsert_customer(
        &self,
        tenant_id: TenantId,
        row: &CustomerRecord,
    ) -> Result<CustomerId, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO customers (tenant_id, external_id, email, first_name, last_name, total_spent)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, external_id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                total_spent = EXCLUDED.total_spent
            RETURNING id
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(row.external_id.as_str())
        .bind(row.email.as_deref())
        .bind(row.first_name.as_deref())
        .bind(row.last_name.as_deref())
        .bind(row.total_spent)
        .fetch_one(self.pool)
        .await?;

        Ok(CustomerId::new(result.try_get("id")?))
    }

    async fn customer_ids(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<(ExternalId, CustomerId)>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT external_id, id
            FROM customers
            WHERE tenant_id = $1
            ",
        )
        .bind(tenant_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            let external_id: String = row.try_get("external_id")?;
            let id: i32 = row.try_get("id")?;
            pairs.push((ExternalId::from(external_id), CustomerId::new(id)));
        }
        Ok(pairs)
    }
}
