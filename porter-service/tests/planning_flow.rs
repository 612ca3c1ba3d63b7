//! End-to-end planning flows against a live PostgreSQL.
//!
//! Point `PORTER_TEST_DATABASE_URL` at a scratch database and run with
//! `cargo test -- --ignored --test-threads=1`. Tables are truncated
//! between tests.

use porter_store::{DbClient, PlannerConfig};
use porter_service::{RobotService, ServiceError};

async fn scratch_db() -> DbClient {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "porter_service=info".into()),
        )
        .try_init()
        .ok();

    let url = std::env::var("PORTER_TEST_DATABASE_URL")
        .expect("PORTER_TEST_DATABASE_URL must point at a scratch database");
    let db = DbClient::new(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    sqlx::query("TRUNCATE orders, products RESTART IDENTITY CASCADE")
        .execute(&db.pool)
        .await
        .expect("truncate");
    db
}

fn generous_planner() -> PlannerConfig {
    PlannerConfig {
        plan_deadline_ms: 10_000,
        cancel_check_interval: 16_384,
    }
}

async fn seed_product(db: &DbClient, name: &str, weight: i64, value: i64) -> i64 {
    let (product_id,): (i64,) = sqlx::query_as(
        "INSERT INTO products (name, value, weight) VALUES ($1, $2, $3) RETURNING product_id",
    )
    .bind(name)
    .bind(value)
    .bind(weight)
    .fetch_one(&db.pool)
    .await
    .expect("insert product");
    product_id
}

async fn seed_order(db: &DbClient, user_id: i64, product_id: i64) -> i64 {
    let (order_id,): (i64,) = sqlx::query_as(
        "INSERT INTO orders (user_id, product_id) VALUES ($1, $2) RETURNING order_id",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(&db.pool)
    .await
    .expect("insert order");
    order_id
}

async fn statuses(db: &DbClient) -> Vec<(i64, String)> {
    sqlx::query_as("SELECT order_id, shipped_status FROM orders ORDER BY order_id")
        .fetch_all(&db.pool)
        .await
        .expect("read statuses")
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn plan_claims_the_optimal_set() {
    let db = scratch_db().await;
    let mut order_ids = Vec::new();
    for (name, weight, value) in [("a", 2, 3), ("b", 3, 4), ("c", 4, 5), ("d", 5, 6)] {
        let product_id = seed_product(&db, name, weight, value).await;
        order_ids.push(seed_order(&db, 1, product_id).await);
    }

    let robots = RobotService::new(db.clone(), generous_planner());
    let plan = robots
        .generate_delivery_plan("robot-1", 5)
        .await
        .expect("plan succeeds");

    assert_eq!(plan.robot_id, "robot-1");
    assert_eq!(plan.total_value, 7);
    assert_eq!(plan.total_weight, 5);
    let mut claimed: Vec<i64> = plan.orders.iter().map(|o| o.order_id).collect();
    claimed.sort_unstable();
    assert_eq!(claimed, vec![order_ids[0], order_ids[1]]);

    for (order_id, status) in statuses(&db).await {
        if claimed.contains(&order_id) {
            assert_eq!(status, "delivering");
        } else {
            assert_eq!(status, "shipping");
        }
    }
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn empty_pool_yields_an_empty_plan() {
    let db = scratch_db().await;
    let robots = RobotService::new(db.clone(), generous_planner());
    let plan = robots
        .generate_delivery_plan("robot-1", 50)
        .await
        .expect("empty pool is not an error");
    assert_eq!(plan.total_value, 0);
    assert!(plan.orders.is_empty());
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn concurrent_plans_claim_disjoint_orders() {
    let db = scratch_db().await;
    let product_id = seed_product(&db, "parcel", 2, 3).await;
    for _ in 0..30 {
        seed_order(&db, 1, product_id).await;
    }

    let first = RobotService::new(db.clone(), generous_planner());
    let second = RobotService::new(db.clone(), generous_planner());
    let (plan_a, plan_b) = tokio::join!(
        first.generate_delivery_plan("robot-a", 10),
        second.generate_delivery_plan("robot-b", 10),
    );
    let plan_a = plan_a.expect("first plan");
    let plan_b = plan_b.expect("second plan");

    assert_eq!(plan_a.orders.len(), 5);
    assert_eq!(plan_b.orders.len(), 5);
    let ids_a: std::collections::HashSet<i64> =
        plan_a.orders.iter().map(|o| o.order_id).collect();
    assert!(plan_b.orders.iter().all(|o| !ids_a.contains(&o.order_id)));
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn fired_deadline_rolls_the_claim_back() {
    let db = scratch_db().await;
    // Equal densities defeat the bound, so the search cannot finish a pool
    // this size before a 1ms deadline.
    let product_id = seed_product(&db, "parcel", 2, 3).await;
    sqlx::query(
        "INSERT INTO orders (user_id, product_id) SELECT 1, $1 FROM generate_series(1, 2000)",
    )
    .bind(product_id)
    .execute(&db.pool)
    .await
    .expect("seed pool");

    let robots = RobotService::new(
        db.clone(),
        PlannerConfig {
            plan_deadline_ms: 1,
            cancel_check_interval: 16_384,
        },
    );
    let err = robots
        .generate_delivery_plan("robot-1", 21)
        .await
        .expect_err("deadline fires");
    assert!(matches!(err, ServiceError::Cancelled { .. }));

    let (still_shipping,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE shipped_status = 'shipping'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(still_shipping, 2_000);
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn robot_report_completes_an_order_once() {
    let db = scratch_db().await;
    let product_id = seed_product(&db, "parcel", 2, 3).await;
    let order_id = seed_order(&db, 1, product_id).await;

    let robots = RobotService::new(db.clone(), generous_planner());
    robots
        .update_order_status(order_id, "delivering")
        .await
        .expect("claim report");
    robots
        .update_order_status(order_id, "completed")
        .await
        .expect("arrival report");

    let (arrived,): (Option<chrono::DateTime<chrono::Utc>>,) =
        sqlx::query_as("SELECT arrived_at FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    let first_stamp = arrived.expect("arrival stamped");

    robots
        .update_order_status(order_id, "completed")
        .await
        .expect("repeat report");
    let (arrived_again,): (Option<chrono::DateTime<chrono::Utc>>,) =
        sqlx::query_as("SELECT arrived_at FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(arrived_again, Some(first_stamp));
}

#[tokio::test]
#[ignore = "needs PORTER_TEST_DATABASE_URL"]
async fn bad_status_reports_fail_fast() {
    let db = scratch_db().await;
    let robots = RobotService::new(db.clone(), generous_planner());

    let err = robots
        .update_order_status(1, "sideways")
        .await
        .expect_err("unknown status");
    assert!(matches!(err, ServiceError::InvalidArgument(_)));

    let err = robots
        .update_order_status(1, "shipping")
        .await
        .expect_err("orders cannot re-enter shipping");
    assert!(matches!(err, ServiceError::InvalidArgument(_)));
}
