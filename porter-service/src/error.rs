use std::time::Duration;

use porter_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Persistence round-trip failed; the surrounding transaction, if any,
    /// was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The plan deadline fired; no orders changed state and the best
    /// solution found so far was discarded.
    #[error("plan deadline of {deadline:?} exceeded")]
    Cancelled { deadline: Duration },

    /// Rejected before any store round-trip.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The search task died instead of returning, which indicates a bug in
    /// the planner rather than a planning outcome.
    #[error("planner task aborted: {0}")]
    PlannerAborted(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(StoreError::from(err))
    }
}
