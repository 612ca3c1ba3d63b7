use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use porter_core::models::{Candidate, ListRequest, NewOrder, OrderStatus, OrderSummary};

use crate::error::StoreError;
use crate::query::{order_sort_field, search_pattern, sort_direction};

/// Order persistence. Every method takes `&mut PgConnection`; both a pooled
/// connection and an open transaction hand one out, so the coordinator
/// composes these calls under a transaction without a second code path.
pub struct OrderRepository;

#[derive(sqlx::FromRow)]
struct CandidateRow {
    order_id: i64,
    weight: i64,
    value: i64,
}

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    order_id: i64,
    product_id: i64,
    product_name: String,
    shipped_status: String,
    created_at: DateTime<Utc>,
    arrived_at: Option<DateTime<Utc>>,
}

impl OrderSummaryRow {
    fn into_summary(self) -> Result<OrderSummary, StoreError> {
        let shipped_status = self
            .shipped_status
            .parse::<OrderStatus>()
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(OrderSummary {
            order_id: self.order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            shipped_status,
            created_at: self.created_at,
            arrived_at: self.arrived_at,
        })
    }
}

impl OrderRepository {
    /// Insert a new order in `shipping` state and return the store-assigned
    /// identifier as a decimal string.
    pub async fn create(conn: &mut PgConnection, order: &NewOrder) -> Result<String, StoreError> {
        let (order_id,): (i64,) = sqlx::query_as(
            "INSERT INTO orders (user_id, product_id, shipped_status, created_at) \
             VALUES ($1, $2, 'shipping', NOW()) \
             RETURNING order_id",
        )
        .bind(order.user_id)
        .bind(order.product_id)
        .fetch_one(conn)
        .await?;
        Ok(order_id.to_string())
    }

    /// Bulk status transition as a single statement: one round-trip, one
    /// atomic effect. No-op on empty input. Moving orders to `completed`
    /// stamps `arrived_at` once; re-applying the transition leaves the
    /// stamp untouched.
    pub async fn update_statuses(
        conn: &mut PgConnection,
        order_ids: &[i64],
        new_status: OrderStatus,
    ) -> Result<(), StoreError> {
        if order_ids.is_empty() {
            return Ok(());
        }
        let sql = match new_status {
            OrderStatus::Completed => {
                "UPDATE orders \
                 SET shipped_status = $1, arrived_at = COALESCE(arrived_at, NOW()) \
                 WHERE order_id = ANY($2)"
            }
            _ => "UPDATE orders SET shipped_status = $1 WHERE order_id = ANY($2)",
        };
        sqlx::query(sql)
            .bind(new_status.as_str())
            .bind(order_ids)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Every `shipping` order joined with its product's weight and value,
    /// in ascending order-id.
    ///
    /// The candidate rows are locked (`FOR UPDATE OF o`): a concurrent
    /// planner blocks here until our claim commits, after which the status
    /// predicate no longer matches the claimed rows. The set is
    /// intentionally unbounded; the planner needs the complete pool.
    pub async fn shipping_candidates(
        conn: &mut PgConnection,
    ) -> Result<Vec<Candidate>, StoreError> {
        let rows: Vec<CandidateRow> = sqlx::query_as(
            "SELECT o.order_id, p.weight, p.value \
             FROM orders o \
             JOIN products p ON o.product_id = p.product_id \
             WHERE o.shipped_status = 'shipping' \
             ORDER BY o.order_id \
             FOR UPDATE OF o",
        )
        .fetch_all(conn)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Candidate {
                order_id: row.order_id,
                weight: row.weight,
                value: row.value,
            })
            .collect())
    }

    /// User-scoped order history with the shared search, sort and
    /// pagination discipline. Returns the page plus the total row count for
    /// the filter.
    pub async fn list_orders(
        conn: &mut PgConnection,
        user_id: i64,
        req: &ListRequest,
    ) -> Result<(Vec<OrderSummary>, i64), StoreError> {
        let pattern = search_pattern(req);

        let mut count_sql = String::from(
            "SELECT COUNT(*) \
             FROM orders o \
             JOIN products p ON o.product_id = p.product_id \
             WHERE o.user_id = $1",
        );
        if pattern.is_some() {
            count_sql.push_str(" AND p.name LIKE $2");
        }
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern.clone());
        }
        let total = count_query.fetch_one(&mut *conn).await?;

        // The sort column comes from the allowlist, never from user input.
        let sort_field = order_sort_field(&req.sort_field);
        let direction = sort_direction(req);

        let mut sql = String::from(
            "SELECT o.order_id, o.product_id, p.name AS product_name, \
                    o.shipped_status, o.created_at, o.arrived_at \
             FROM orders o \
             JOIN products p ON o.product_id = p.product_id \
             WHERE o.user_id = $1",
        );
        if pattern.is_some() {
            sql.push_str(" AND p.name LIKE $2");
        }
        // Secondary key in the same direction keeps pagination stable when
        // the primary sort admits duplicates.
        if sort_field == "o.order_id" {
            sql.push_str(&format!(" ORDER BY {sort_field} {direction}"));
        } else {
            sql.push_str(&format!(
                " ORDER BY {sort_field} {direction}, o.order_id {direction}"
            ));
        }
        if pattern.is_some() {
            sql.push_str(" LIMIT $3 OFFSET $4");
        } else {
            sql.push_str(" LIMIT $2 OFFSET $3");
        }

        let mut page_query = sqlx::query_as::<_, OrderSummaryRow>(&sql).bind(user_id);
        if let Some(pattern) = &pattern {
            page_query = page_query.bind(pattern.clone());
        }
        let rows = page_query
            .bind(req.page_size)
            .bind(req.offset)
            .fetch_all(&mut *conn)
            .await?;

        let orders = rows
            .into_iter()
            .map(OrderSummaryRow::into_summary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((orders, total))
    }
}
