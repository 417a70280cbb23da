use std::future::Future;
use std::time::Duration;

pub mod referral_code;
pub mod referral_history;
pub mod reward;

pub use referral_code::{PgReferralCodeRepository, ReferralCodeRepository};
pub use referral_history::{PgReferralHistoryRepository, ReferralHistoryRepository};
pub use reward::{PgRewardRepository, RewardRepository};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
    #[error("No row affected")]
    NotFound,
    #[error("Insert returned no id")]
    MissingId,
}

/// Runs a query under a deadline, translating unique violations into `Conflict`.
pub(crate) async fn with_timeout<T, F>(limit: Duration, query: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(sqlx::Error::Database(e))) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Err(RepositoryError::Conflict(
                e.constraint().unwrap_or_default().to_string(),
            ))
        }
        Ok(Err(e)) => Err(RepositoryError::Database(e)),
        Err(_) => Err(RepositoryError::Timeout(limit)),
    }
}
