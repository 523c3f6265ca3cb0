//! Read-only aggregate queries over a tenant's synced snapshot.
//!
//! These back the query surface (summary, revenue series, top customers).
//! Every query takes the tenant id explicitly - there is no default tenant.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};

use tidesync_core::TenantId;

use super::RepositoryError;

/// Aggregate totals for one tenant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub total_customers: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
}

/// One day of revenue in a time-bucketed series.
#[derive(Debug, Clone, Serialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

/// A customer ranked by accumulated spend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_spent: Decimal,
}

/// Repository for aggregate queries.
pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Totals for one tenant: customer count, order count, summed revenue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, tenant_id: TenantId) -> Result<TenantSummary, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT count(*) FROM customers WHERE tenant_id = $1) AS total_customers,
                (SELECT count(*) FROM orders WHERE tenant_id = $1) AS total_orders,
                (SELECT COALESCE(sum(total_price), 0) FROM orders WHERE tenant_id = $1) AS total_revenue
            ",
        )
        .bind(tenant_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        Ok(TenantSummary {
            total_customers: row.try_get("total_customers")?,
            total_orders: row.try_get("total_orders")?,
            total_revenue: row.try_get("total_revenue")?,
        })
    }

    /// Day-bucketed revenue between `start` and `end` (both inclusive).
    ///
    /// Days without orders are absent from the series.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_by_day(
        &self,
        tenant_id: TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RevenuePoint>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT (placed_at AT TIME ZONE 'UTC')::date AS day,
                   sum(total_price) AS revenue
            FROM orders
            WHERE tenant_id = $1
              AND placed_at >= $2
              AND placed_at < $3 + 1
            GROUP BY day
            ORDER BY day
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(start)
        .bind(end)
        .fetch_all(self.pool)
        .await?;

        let mut series = Vec::with_capacity(rows.len());
        for row in rows {
            series.push(RevenuePoint {
                date: row.try_get("day")?,
                revenue: row.try_get("revenue")?,
            });
        }
        Ok(series)
    }

    /// The tenant's top `limit` customers by accumulated spend.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_customers(
        &self,
        tenant_id: TenantId,
        limit: i64,
    ) -> Result<Vec<TopCustomer>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT first_name, last_name, total_spent
            FROM customers
            WHERE tenant_id = $1
            ORDER BY total_spent DESC
            LIMIT $2
            ",
        )
        .bind(tenant_id.as_i32())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        let mut top = Vec::with_capacity(rows.len());
        for row in rows {
            top.push(TopCustomer {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                total_spent: row.try_get("total_spent")?,
            });
        }
        Ok(top)
    }
}
