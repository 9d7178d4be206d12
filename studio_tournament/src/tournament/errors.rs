//! Tournament error types.

use super::models::{CompetitionId, CompetitionStatus, MatchId, MatchStatus};
use crate::db::timeouts::TimeoutError;
use std::time::Duration;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Fewer than two confirmed registrants after deduplication
    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    /// Unrecognized tournament format string
    #[error("Invalid tournament format: {0}")]
    InvalidFormat(String),

    /// Another generation for the same competition is running
    #[error("Match generation already in progress for competition {0}")]
    GenerationInProgress(CompetitionId),

    /// Operation not permitted from the match's current status
    #[error("Match {match_id} is {status}, operation not permitted")]
    InvalidMatchState { match_id: MatchId, status: MatchStatus },

    /// One or both scores missing from a result submission
    #[error("Both scores are required to record a result")]
    IncompleteScoreData,

    /// Score is negative or too large to store
    #[error("Score out of range: {0}")]
    ScoreOutOfRange(i64),

    /// Competition status does not allow the requested operation
    #[error("Competition {competition_id} is {status}, operation not permitted")]
    CompetitionStateConflict {
        competition_id: CompetitionId,
        status: CompetitionStatus,
    },

    #[error("Competition not found: {0}")]
    CompetitionNotFound(CompetitionId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Generation parameter failed validation
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Get a client-safe error message that doesn't leak database internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Serialization(_) => {
                "Internal server error".to_string()
            }
            TournamentError::Timeout(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TournamentError::GenerationInProgress(_) | TournamentError::Timeout(_)
        )
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => TournamentError::Timeout(duration),
            TimeoutError::Database(e) => TournamentError::Database(e),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
