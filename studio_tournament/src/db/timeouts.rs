//! Deadlines for database round-trips.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Deadline for single reads and single-row writes
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a whole bracket replacement transaction
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for operations run under a deadline
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for operations run under a deadline
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run `future` and give up after `duration`.
///
/// The future keeps its own error type; an elapsed deadline is converted
/// through `From<TimeoutError>`. Dropping a pending sqlx transaction rolls it
/// back, so a timed-out write leaves nothing behind.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError::Timeout(duration).into()),
    }
}

/// Run `future` under [`DEFAULT_QUERY_TIMEOUT`]
pub async fn with_query_timeout<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
