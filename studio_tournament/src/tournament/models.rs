//! Competition, group and match data models.

use super::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Competition ID type
pub type CompetitionId = i64;

/// Match ID type
pub type MatchId = i64;

/// Group ID type
pub type GroupId = i64;

/// Participant ID type (one per confirmed registration)
pub type ParticipantId = i64;

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Everyone plays everyone once
    RoundRobin,
    /// Round-robin groups followed by single elimination among group winners
    GroupKnockout,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::RoundRobin => "round_robin",
            TournamentFormat::GroupKnockout => "group_knockout",
        }
    }
}

impl FromStr for TournamentFormat {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(TournamentFormat::RoundRobin),
            "group_knockout" => Ok(TournamentFormat::GroupKnockout),
            other => Err(TournamentError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Competition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Upcoming,
    /// Accepting registrations
    Registration,
    /// Registration closed, bracket not yet generated
    Preparation,
    /// Matches generated and being played
    InProgress,
    Completed,
    Cancelled,
}

impl CompetitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionStatus::Upcoming => "upcoming",
            CompetitionStatus::Registration => "registration",
            CompetitionStatus::Preparation => "preparation",
            CompetitionStatus::InProgress => "in_progress",
            CompetitionStatus::Completed => "completed",
            CompetitionStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses from which a bracket may be generated unconditionally
    pub fn accepts_generation(&self) -> bool {
        matches!(
            self,
            CompetitionStatus::Upcoming
                | CompetitionStatus::Registration
                | CompetitionStatus::Preparation
        )
    }
}

impl FromStr for CompetitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(CompetitionStatus::Upcoming),
            "registration" => Ok(CompetitionStatus::Registration),
            "preparation" => Ok(CompetitionStatus::Preparation),
            "in_progress" => Ok(CompetitionStatus::InProgress),
            "completed" => Ok(CompetitionStatus::Completed),
            "cancelled" => Ok(CompetitionStatus::Cancelled),
            other => Err(format!("unknown competition status '{other}'")),
        }
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// A resolved match no longer blocks bracket advancement
    pub fn is_resolved(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    GroupStage,
    Knockout,
    /// Knockout round with exactly two entrants
    Final,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::GroupStage => "group_stage",
            MatchType::Knockout => "knockout",
            MatchType::Final => "final",
        }
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group_stage" => Ok(MatchType::GroupStage),
            "knockout" => Ok(MatchType::Knockout),
            "final" => Ok(MatchType::Final),
            other => Err(format!("unknown match type '{other}'")),
        }
    }
}

/// Competition record as exposed by the competition CRUD layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: CompetitionStatus,
    /// Number of physical tables available
    pub table_count: u32,
    /// Duration reserved for each match in minutes
    pub slot_interval_mins: u32,
    /// Start of the first slot
    pub start_time: DateTime<Utc>,
    /// Seed used by the most recent generation
    pub generation_seed: Option<u64>,
    pub created_by: i64,
}

impl Competition {
    /// Check whether the bracket may be (re)generated.
    ///
    /// An `in_progress` competition may be regenerated only while none of its
    /// matches has left the `scheduled` state.
    pub fn check_generation_allowed(&self, has_match_progress: bool) -> TournamentResult<()> {
        let allowed = self.status.accepts_generation()
            || (self.status == CompetitionStatus::InProgress && !has_match_progress);

        if allowed {
            Ok(())
        } else {
            Err(TournamentError::CompetitionStateConflict {
                competition_id: self.id,
                status: self.status,
            })
        }
    }
}

/// Group of participants playing a round-robin among themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub competition_id: CompetitionId,
    /// Stable label derived from the group's position (`A`, `B`, ...)
    pub label: String,
    /// Position of the group in generation order
    pub position: u32,
    /// Members in seed order
    pub members: Vec<ParticipantId>,
}

/// Group produced by the partitioner, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub label: String,
    pub members: Vec<ParticipantId>,
}

/// Pairing emitted by the scheduler with no table or time yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMatch {
    pub player_a: ParticipantId,
    pub player_b: ParticipantId,
    pub round_number: u32,
    pub match_type: MatchType,
    /// Index into the generated group list for group-stage matches
    pub group_index: Option<usize>,
}

/// Pairing with its table and start time assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMatch {
    pub pairing: PendingMatch,
    /// Global position in the competition's slot sequence
    pub slot_index: u32,
    pub table_index: u32,
    pub scheduled_start: DateTime<Utc>,
}

/// Persisted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub competition_id: CompetitionId,
    pub group_id: Option<GroupId>,
    pub player_a: ParticipantId,
    pub player_b: ParticipantId,
    pub match_type: MatchType,
    pub round_number: u32,
    pub slot_index: u32,
    pub table_index: u32,
    pub scheduled_start: DateTime<Utc>,
    pub status: MatchStatus,
    pub score_a: Option<u32>,
    pub score_b: Option<u32>,
    /// `None` for a draw or an unplayed match
    pub winner: Option<ParticipantId>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

impl Match {
    /// Build an unplayed match from a scheduled pairing
    pub fn from_scheduled(
        id: MatchId,
        competition_id: CompetitionId,
        group_id: Option<GroupId>,
        scheduled: &ScheduledMatch,
    ) -> Self {
        Self {
            id,
            competition_id,
            group_id,
            player_a: scheduled.pairing.player_a,
            player_b: scheduled.pairing.player_b,
            match_type: scheduled.pairing.match_type,
            round_number: scheduled.pairing.round_number,
            slot_index: scheduled.slot_index,
            table_index: scheduled.table_index,
            scheduled_start: scheduled.scheduled_start,
            status: MatchStatus::Scheduled,
            score_a: None,
            score_b: None,
            winner: None,
            actual_start: None,
            actual_end: None,
        }
    }

    /// Whether the participant plays in this match
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.player_a == participant || self.player_b == participant
    }

    /// Opponent of the given participant, if they play in this match
    pub fn opponent_of(&self, participant: ParticipantId) -> Option<ParticipantId> {
        if self.player_a == participant {
            Some(self.player_b)
        } else if self.player_b == participant {
            Some(self.player_a)
        } else {
            None
        }
    }

    /// Time between the recorded start and end
    pub fn duration(&self) -> Option<Duration> {
        match (self.actual_start, self.actual_end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Aggregated performance of one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub group_label: Option<String>,
    pub matches_played: u32,
    pub matches_won: u32,
    pub matches_lost: u32,
    pub matches_drawn: u32,
    pub score_for: u64,
    pub score_against: u64,
    /// Fraction of played matches won, 0 when nothing has been played
    pub win_rate: f64,
    pub score_difference: i64,
    /// Rank inside the participant's group (1-indexed)
    pub group_rank: Option<u32>,
    /// Rank across the whole competition (1-indexed)
    pub overall_rank: u32,
}

/// Everything a repository needs to replace a competition's bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketPlan {
    pub format: TournamentFormat,
    pub table_count: u32,
    pub slot_interval_mins: u32,
    pub start_time: DateTime<Utc>,
    pub seed: u64,
    pub groups: Vec<NewGroup>,
    pub matches: Vec<ScheduledMatch>,
}

/// Result of a successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub competition_id: CompetitionId,
    pub format: TournamentFormat,
    /// Seed the partitioner used, recorded so the bracket can be reproduced
    pub seed: u64,
    pub groups: Vec<Group>,
    pub matches: Vec<Match>,
}

/// Derive a group label from its index: `A`..`Z`, then `AA`, `AB`, ...
pub fn group_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}
