use thiserror::Error;

/// A persistence round-trip failed. Surfaced as-is; retrying is the
/// caller's decision.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("failed to decode row: {0}")]
    Decode(String),
}
