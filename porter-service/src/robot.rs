//! The planning coordinator: one bounded transaction around candidate
//! read, search and claim.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use porter_core::models::{DeliveryPlan, OrderStatus};
use porter_core::planner;
use porter_store::{DbClient, OrderRepository, PlannerConfig};

use crate::error::ServiceError;

pub struct RobotService {
    db: DbClient,
    planner: PlannerConfig,
}

impl RobotService {
    pub fn new(db: DbClient, planner: PlannerConfig) -> Self {
        Self { db, planner }
    }

    /// Claim the maximum-value feasible set of `shipping` orders for
    /// `robot_id`.
    ///
    /// On success every returned order has been committed as `delivering`
    /// and is visible in that state to any subsequent reader. On any error,
    /// including a fired deadline, the transaction rolls back and the
    /// candidate pool is untouched.
    pub async fn generate_delivery_plan(
        &self,
        robot_id: &str,
        capacity: i64,
    ) -> Result<DeliveryPlan, ServiceError> {
        let (cancel, watchdog) = self.arm_deadline();
        let result = self.plan_and_claim(robot_id, capacity, &cancel).await;
        watchdog.abort();
        result
    }

    /// Robot-report path: transition a single order under the same deadline
    /// discipline. Unknown statuses and attempts to re-enter `shipping` are
    /// rejected before any round-trip.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: &str,
    ) -> Result<(), ServiceError> {
        let status: OrderStatus = new_status.parse().map_err(|_| {
            ServiceError::InvalidArgument(format!("unknown order status: {new_status}"))
        })?;
        if status == OrderStatus::Shipping {
            return Err(ServiceError::InvalidArgument(
                "orders cannot return to the shipping state".to_string(),
            ));
        }

        let (cancel, watchdog) = self.arm_deadline();
        let deadline = self.planner.plan_deadline();
        let result = async {
            let mut conn = bounded(&cancel, deadline, self.db.pool.acquire()).await?;
            bounded(
                &cancel,
                deadline,
                OrderRepository::update_statuses(&mut conn, &[order_id], status),
            )
            .await
        }
        .await;
        watchdog.abort();
        result
    }

    async fn plan_and_claim(
        &self,
        robot_id: &str,
        capacity: i64,
        cancel: &CancellationToken,
    ) -> Result<DeliveryPlan, ServiceError> {
        let deadline = self.planner.plan_deadline();

        let mut tx = bounded(cancel, deadline, self.db.pool.begin()).await?;

        let candidates = bounded(
            cancel,
            deadline,
            OrderRepository::shipping_candidates(&mut tx),
        )
        .await?;

        // The search is CPU-bound; keep it off the async workers. It
        // notices a fired deadline itself through the shared token.
        let plan = {
            let cancel = cancel.clone();
            let robot_id = robot_id.to_string();
            let check_every = self.planner.cancel_check_interval;
            tokio::task::spawn_blocking(move || {
                planner::plan(&candidates, &robot_id, capacity, &cancel, check_every)
            })
            .await?
            .map_err(|cancelled| {
                warn!(
                    after_steps = cancelled.after_steps,
                    "plan search cancelled by deadline"
                );
                ServiceError::Cancelled { deadline }
            })?
        };

        if !plan.orders.is_empty() {
            let order_ids: Vec<i64> = plan.orders.iter().map(|order| order.order_id).collect();
            bounded(
                cancel,
                deadline,
                OrderRepository::update_statuses(&mut tx, &order_ids, OrderStatus::Delivering),
            )
            .await?;
            info!(
                robot_id,
                count = order_ids.len(),
                total_value = plan.total_value,
                "claimed orders for delivery"
            );
        }

        bounded(cancel, deadline, tx.commit()).await?;
        Ok(plan)
    }

    fn arm_deadline(&self) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let deadline = self.planner.plan_deadline();
        let watchdog = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        };
        (cancel, watchdog)
    }
}

/// Race a store round-trip against the deadline token; the round-trip is
/// abandoned as soon as the deadline fires.
async fn bounded<T, E>(
    cancel: &CancellationToken,
    deadline: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, ServiceError>
where
    E: Into<ServiceError>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(ServiceError::Cancelled { deadline }),
        result = fut => result.map_err(Into::into),
    }
}
