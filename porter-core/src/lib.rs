pub mod error;
pub mod models;
pub mod planner;

pub use error::PlanCancelled;
pub use models::{
    Candidate, DeliveryPlan, ListRequest, NewOrder, OrderStatus, OrderSummary, Product,
};
