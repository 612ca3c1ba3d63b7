use porter_core::models::{ListRequest, NewOrder, OrderSummary};
use porter_store::{DbClient, OrderRepository};

use crate::error::ServiceError;

/// Customer-facing order flows. Both run on a pooled connection outside
/// any transaction; only the coordinator's claim needs one.
pub struct OrderService {
    db: DbClient,
}

impl OrderService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Create an order in `shipping` state and return its identifier.
    pub async fn create_order(&self, order: &NewOrder) -> Result<String, ServiceError> {
        let mut conn = self.db.pool.acquire().await?;
        Ok(OrderRepository::create(&mut conn, order).await?)
    }

    /// A user's order history page plus the total count for the filter.
    pub async fn list_orders(
        &self,
        user_id: i64,
        req: &ListRequest,
    ) -> Result<(Vec<OrderSummary>, i64), ServiceError> {
        let mut conn = self.db.pool.acquire().await?;
        Ok(OrderRepository::list_orders(&mut conn, user_id, req).await?)
    }
}
