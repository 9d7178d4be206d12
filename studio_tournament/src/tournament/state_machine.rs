//! Match lifecycle state machine.
//!
//! ```text
//! scheduled   --start-->  in_progress
//! scheduled   --record--> completed
//! scheduled   --cancel--> cancelled
//! in_progress --cancel--> cancelled
//! ```
//!
//! Transitions are pure functions over [`Match`]; repositories call
//! [`Match::apply`] while holding the row lock so that two writers on the same
//! match are serialized.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, MatchStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw scores as submitted by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score_a: Option<i64>,
    pub score_b: Option<i64>,
}

impl ScoreSubmission {
    pub fn new(score_a: i64, score_b: i64) -> Self {
        Self {
            score_a: Some(score_a),
            score_b: Some(score_b),
        }
    }

    /// Check both scores are present and non-negative
    ///
    /// # Errors
    ///
    /// * `TournamentError::IncompleteScoreData` - A score is missing
    /// * `TournamentError::ScoreOutOfRange` - A score is negative or above [`MAX_SCORE`]
    pub fn validate(&self) -> TournamentResult<(u32, u32)> {
        let (Some(a), Some(b)) = (self.score_a, self.score_b) else {
            return Err(TournamentError::IncompleteScoreData);
        };
        Ok((to_score(a)?, to_score(b)?))
    }
}

/// Largest score the `INTEGER` score columns hold
pub const MAX_SCORE: u32 = i32::MAX as u32;

fn to_score(value: i64) -> TournamentResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|score| *score <= MAX_SCORE)
        .ok_or(TournamentError::ScoreOutOfRange(value))
}

/// Event applied to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTransition {
    /// Players sat down at the table
    Start,
    /// Final score submitted
    Record(ScoreSubmission),
    Cancel,
}

impl MatchTransition {
    fn permitted_from(&self, status: MatchStatus) -> bool {
        match self {
            MatchTransition::Start | MatchTransition::Record(_) => status == MatchStatus::Scheduled,
            MatchTransition::Cancel => {
                matches!(status, MatchStatus::Scheduled | MatchStatus::InProgress)
            }
        }
    }
}

impl Match {
    /// Apply a transition at time `now`.
    ///
    /// The match is left untouched when an error is returned.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidMatchState` - Transition not allowed from the current status;
    ///   results are only accepted while the match is `scheduled`
    /// * `TournamentError::IncompleteScoreData` - Result submitted without both scores
    /// * `TournamentError::ScoreOutOfRange` - Result carries a negative or oversized score
    pub fn apply(&mut self, transition: MatchTransition, now: DateTime<Utc>) -> TournamentResult<()> {
        if !transition.permitted_from(self.status) {
            return Err(TournamentError::InvalidMatchState {
                match_id: self.id,
                status: self.status,
            });
        }

        match transition {
            MatchTransition::Start => {
                self.status = MatchStatus::InProgress;
                self.actual_start = Some(now);
            }
            MatchTransition::Record(submission) => {
                let (score_a, score_b) = submission.validate()?;
                self.score_a = Some(score_a);
                self.score_b = Some(score_b);
                self.winner = winner_for(self.player_a, self.player_b, score_a, score_b);
                self.status = MatchStatus::Completed;
                self.actual_start = Some(now);
                self.actual_end = Some(now);
            }
            MatchTransition::Cancel => {
                self.status = MatchStatus::Cancelled;
            }
        }

        Ok(())
    }
}

/// Higher score wins; equal scores are a draw
fn winner_for<T>(player_a: T, player_b: T, score_a: u32, score_b: u32) -> Option<T> {
    match score_a.cmp(&score_b) {
        std::cmp::Ordering::Greater => Some(player_a),
        std::cmp::Ordering::Less => Some(player_b),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{MatchType, PendingMatch, ScheduledMatch};

    fn scheduled_match() -> Match {
        let scheduled = ScheduledMatch {
            pairing: PendingMatch {
                player_a: 100,
                player_b: 200,
                round_number: 1,
                match_type: MatchType::GroupStage,
                group_index: None,
            },
            slot_index: 0,
            table_index: 0,
            scheduled_start: Utc::now(),
        };
        Match::from_scheduled(1, 1, None, &scheduled)
    }

    #[test]
    fn test_record_player_a_wins() {
        let mut m = scheduled_match();
        let now = Utc::now();
        m.apply(MatchTransition::Record(ScoreSubmission::new(3, 1)), now)
            .unwrap();

        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner, Some(100));
        assert_eq!((m.score_a, m.score_b), (Some(3), Some(1)));
        assert_eq!(m.actual_end, Some(now));
        assert!(m.actual_start.is_some());
    }

    #[test]
    fn test_record_player_b_wins() {
        let mut m = scheduled_match();
        m.apply(MatchTransition::Record(ScoreSubmission::new(0, 2)), Utc::now())
            .unwrap();
        assert_eq!(m.winner, Some(200));
    }

    #[test]
    fn test_record_draw_has_no_winner() {
        let mut m = scheduled_match();
        m.apply(MatchTransition::Record(ScoreSubmission::new(2, 2)), Utc::now())
            .unwrap();
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner, None);
    }

    #[test]
    fn test_second_record_rejected() {
        let mut m = scheduled_match();
        m.apply(MatchTransition::Record(ScoreSubmission::new(3, 1)), Utc::now())
            .unwrap();
        let err = m
            .apply(MatchTransition::Record(ScoreSubmission::new(1, 3)), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidMatchState {
                status: MatchStatus::Completed,
                ..
            }
        ));
        assert_eq!(m.winner, Some(100));
    }

    #[test]
    fn test_missing_score_rejected_without_mutation() {
        let mut m = scheduled_match();
        let submission = ScoreSubmission {
            score_a: Some(3),
            score_b: None,
        };
        let err = m.apply(MatchTransition::Record(submission), Utc::now()).unwrap_err();
        assert!(matches!(err, TournamentError::IncompleteScoreData));
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.score_a, None);
    }

    #[test]
    fn test_negative_score_rejected() {
        let mut m = scheduled_match();
        let err = m
            .apply(MatchTransition::Record(ScoreSubmission::new(-1, 2)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, TournamentError::ScoreOutOfRange(-1)));
    }

    #[test]
    fn test_score_above_column_range_rejected() {
        let mut m = scheduled_match();
        let err = m
            .apply(
                MatchTransition::Record(ScoreSubmission::new(3_000_000_000, 0)),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::ScoreOutOfRange(3_000_000_000)));
        assert_eq!(m.status, MatchStatus::Scheduled);

        m.apply(
            MatchTransition::Record(ScoreSubmission::new(i64::from(MAX_SCORE), 0)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(m.score_a, Some(MAX_SCORE));
    }

    #[test]
    fn test_record_after_start_rejected() {
        let mut m = scheduled_match();
        let started = Utc::now();
        m.apply(MatchTransition::Start, started).unwrap();

        let err = m
            .apply(
                MatchTransition::Record(ScoreSubmission::new(1, 3)),
                started + chrono::Duration::minutes(18),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InvalidMatchState {
                status: MatchStatus::InProgress,
                ..
            }
        ));
        assert_eq!(m.status, MatchStatus::InProgress);
        assert_eq!(m.score_a, None);
        assert_eq!(m.winner, None);
        assert_eq!(m.actual_start, Some(started));
    }

    #[test]
    fn test_record_stamps_start_and_end() {
        let mut m = scheduled_match();
        let now = Utc::now();
        m.apply(MatchTransition::Record(ScoreSubmission::new(0, 0)), now)
            .unwrap();
        assert_eq!(m.actual_start, Some(now));
        assert_eq!(m.duration(), Some(chrono::Duration::zero()));
    }

    #[test]
    fn test_state_checked_before_scores() {
        let mut m = scheduled_match();
        m.apply(MatchTransition::Cancel, Utc::now()).unwrap();
        let err = m
            .apply(
                MatchTransition::Record(ScoreSubmission {
                    score_a: None,
                    score_b: None,
                }),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidMatchState { .. }));
    }

    #[test]
    fn test_start_then_cancel() {
        let mut m = scheduled_match();
        m.apply(MatchTransition::Start, Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::InProgress);
        assert!(m.actual_start.is_some());

        assert!(m.apply(MatchTransition::Start, Utc::now()).is_err());

        m.apply(MatchTransition::Cancel, Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Cancelled);
        assert!(m.apply(MatchTransition::Cancel, Utc::now()).is_err());
    }
}
