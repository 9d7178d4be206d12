//! Tournament manager orchestrating generation, results and standings.

use super::{
    allocator::SlotAllocator,
    bracket::{self, BracketProgress},
    config::GenerationConfig,
    errors::{TournamentError, TournamentResult},
    locks::GenerationLocks,
    models::{
        BracketPlan, CompetitionId, CompetitionStatus, GenerationOutcome, Group, Match, MatchId,
        MatchStatus, ParticipantId, Standing, TournamentFormat,
    },
    partition::{partition, time_seed},
    pool::ParticipantPool,
    scheduler::{self, FIRST_KNOCKOUT_ROUND, RoundShape},
    standings,
    state_machine::{MatchTransition, ScoreSubmission},
};
use crate::db::{CompetitionRepository, PgCompetitionRepository};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a knockout advancement step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BracketAdvance {
    /// Matches of the latest round are still open
    Waiting { round_number: u32, remaining: usize },
    /// A new knockout round was scheduled
    RoundScheduled {
        round_number: u32,
        matches: Vec<Match>,
        bye: Option<ParticipantId>,
    },
    /// Every match is resolved and the competition is completed
    Completed { champion: Option<ParticipantId> },
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    /// Competition storage
    repo: Arc<dyn CompetitionRepository>,

    /// In-flight generations, shared by every clone of the manager
    locks: GenerationLocks,
}

impl TournamentManager {
    /// Create a new tournament manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Competition repository
    ///
    /// # Returns
    ///
    /// * `TournamentManager` - New manager with its own generation locks
    pub fn new(repo: Arc<dyn CompetitionRepository>) -> Self {
        Self::with_locks(repo, GenerationLocks::new())
    }

    /// Create a manager sharing an existing lock set
    pub fn with_locks(repo: Arc<dyn CompetitionRepository>, locks: GenerationLocks) -> Self {
        Self { repo, locks }
    }

    /// Create a manager backed by PostgreSQL
    pub fn with_pool(pool: Arc<PgPool>) -> Self {
        Self::new(Arc::new(PgCompetitionRepository::new(pool.as_ref().clone())))
    }

    pub fn repository(&self) -> &Arc<dyn CompetitionRepository> {
        &self.repo
    }

    /// Generate the full bracket for a competition, replacing any previous one
    ///
    /// Groups (for `group_knockout`) and every initially known match are
    /// created atomically and the competition moves to `in_progress`. Knockout
    /// rounds are added later by [`TournamentManager::advance_knockout`].
    ///
    /// # Arguments
    ///
    /// * `competition_id` - Competition to generate for
    /// * `config` - Format, table pool, slot interval, group size and seed
    ///
    /// # Returns
    ///
    /// * `TournamentResult<GenerationOutcome>` - Created groups and matches with the seed used
    ///
    /// # Errors
    ///
    /// * `TournamentError::GenerationInProgress` - Another generation holds the competition
    /// * `TournamentError::CompetitionStateConflict` - Competition is finished, cancelled or has results
    /// * `TournamentError::InsufficientParticipants` - Fewer than two confirmed registrants
    /// * `TournamentError::InvalidConfig` - Table count, interval or group size out of range
    pub async fn generate_matches(
        &self,
        competition_id: CompetitionId,
        config: GenerationConfig,
    ) -> TournamentResult<GenerationOutcome> {
        let _guard = self.locks.try_acquire(competition_id)?;

        let competition = self.repo.get_competition(competition_id).await?;
        let existing = self.repo.list_matches(competition_id).await?;
        if let Err(e) = competition.check_generation_allowed(has_progress(&existing)) {
            log::warn!("Rejected generation for competition {}: {}", competition_id, e);
            return Err(e);
        }

        let registrants = self.repo.confirmed_registrants(competition_id).await?;
        let pool = ParticipantPool::from_registrants(&registrants)?;
        config.validate(pool.len())?;

        let seed = config.seed.unwrap_or_else(time_seed);
        let planned_groups = match config.format {
            TournamentFormat::RoundRobin => Vec::new(),
            TournamentFormat::GroupKnockout => partition(
                pool.participants(),
                config.effective_group_size(pool.len()),
                seed,
            )?,
        };

        let allocator = SlotAllocator::new(
            config.table_count,
            config.slot_interval_mins,
            config.start_time,
        )?;
        let pending = scheduler::initial_matches(config.format, pool.participants(), &planned_groups);
        let plan = BracketPlan {
            format: config.format,
            table_count: config.table_count,
            slot_interval_mins: config.slot_interval_mins,
            start_time: config.start_time,
            seed,
            groups: planned_groups,
            matches: allocator.allocate(0, pending)?,
        };

        let (groups, matches) = self.repo.replace_bracket(competition_id, &plan).await?;

        log::info!(
            "Generated {} matches in {} groups for competition {} ({}, {} participants, seed {})",
            matches.len(),
            groups.len(),
            competition_id,
            config.format,
            pool.len(),
            seed
        );

        Ok(GenerationOutcome {
            competition_id,
            format: config.format,
            seed,
            groups,
            matches,
        })
    }

    /// Generate using a format string and optional group size.
    ///
    /// Table pool, interval and start time come from the competition record.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidFormat` - `format` is not a known format
    /// * Anything [`TournamentManager::generate_matches`] returns
    pub async fn generate(
        &self,
        competition_id: CompetitionId,
        format: &str,
        group_size: Option<usize>,
    ) -> TournamentResult<GenerationOutcome> {
        let format: TournamentFormat = format.parse()?;
        let competition = self.repo.get_competition(competition_id).await?;

        let mut config = GenerationConfig::for_competition(&competition);
        config.format = format;
        config.group_size = group_size;

        self.generate_matches(competition_id, config).await
    }

    /// Generate with every setting taken from the competition record
    pub async fn generate_with_defaults(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<GenerationOutcome> {
        let competition = self.repo.get_competition(competition_id).await?;
        self.generate_matches(competition_id, GenerationConfig::for_competition(&competition))
            .await
    }

    /// Record a final score
    ///
    /// Only `scheduled` matches accept a result. When the result closes
    /// the latest round the bracket is advanced straight away.
    ///
    /// # Errors
    ///
    /// * `TournamentError::MatchNotFound` - Unknown match
    /// * `TournamentError::InvalidMatchState` - Match is not `scheduled`
    /// * `TournamentError::IncompleteScoreData` - A score is missing
    /// * `TournamentError::ScoreOutOfRange` - A score is negative or does not fit the score column
    pub async fn record_result(
        &self,
        match_id: MatchId,
        score_a: Option<i64>,
        score_b: Option<i64>,
    ) -> TournamentResult<Match> {
        let submission = ScoreSubmission { score_a, score_b };
        let recorded = self
            .transition(match_id, MatchTransition::Record(submission))
            .await?;

        log::debug!(
            "Recorded match {} ({} vs {}): {:?}-{:?}, winner {:?}",
            recorded.id,
            recorded.player_a,
            recorded.player_b,
            recorded.score_a,
            recorded.score_b,
            recorded.winner
        );

        self.advance_after_resolution(recorded.competition_id).await;
        Ok(recorded)
    }

    /// Mark a scheduled match as being played
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.transition(match_id, MatchTransition::Start).await
    }

    /// Cancel a match that has not been completed
    ///
    /// A cancelled knockout match sends nobody through.
    pub async fn cancel_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let cancelled = self.transition(match_id, MatchTransition::Cancel).await?;
        log::info!(
            "Cancelled match {} of competition {}",
            cancelled.id,
            cancelled.competition_id
        );

        self.advance_after_resolution(cancelled.competition_id).await;
        Ok(cancelled)
    }

    async fn transition(
        &self,
        match_id: MatchId,
        transition: MatchTransition,
    ) -> TournamentResult<Match> {
        self.repo
            .apply_match_transition(match_id, transition, Utc::now())
            .await
            .inspect_err(|e| log::warn!("Rejected {:?} on match {}: {}", transition, match_id, e))
    }

    /// The match itself is already stored, so failures here are only logged;
    /// [`TournamentManager::advance_knockout`] can be called again later.
    async fn advance_after_resolution(&self, competition_id: CompetitionId) {
        if let Err(e) = self.advance_knockout(competition_id).await {
            log::warn!(
                "Failed to advance bracket for competition {}: {}",
                competition_id,
                e
            );
        }
    }

    /// Schedule the next knockout round or complete the competition once the
    /// latest round is fully resolved.
    ///
    /// Safe to call at any time and from several callers: a round that
    /// already exists is never scheduled twice.
    ///
    /// # Errors
    ///
    /// * `TournamentError::CompetitionNotFound` - Unknown competition
    /// * `TournamentError::CompetitionStateConflict` - Competition is not `in_progress`
    pub async fn advance_knockout(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<BracketAdvance> {
        let competition = self.repo.get_competition(competition_id).await?;
        if competition.status != CompetitionStatus::InProgress {
            return Err(TournamentError::CompetitionStateConflict {
                competition_id,
                status: competition.status,
            });
        }

        let registrants = self.repo.confirmed_registrants(competition_id).await?;
        let groups = self.repo.list_groups(competition_id).await?;
        let matches = self.repo.list_matches(competition_id).await?;
        let participants = bracket_participants(&registrants, &groups, &matches);

        match bracket::resolve_progress(competition.format, &participants, &groups, &matches) {
            BracketProgress::Pending {
                round_number,
                remaining,
            } => Ok(BracketAdvance::Waiting {
                round_number,
                remaining,
            }),
            BracketProgress::NextRound(round) => {
                let allocator = SlotAllocator::new(
                    competition.table_count,
                    competition.slot_interval_mins,
                    competition.start_time,
                )?;
                let first_slot = matches
                    .iter()
                    .map(|m| m.slot_index + 1)
                    .max()
                    .unwrap_or(0);
                let round_number = round.round_number;
                let pending = round.matches.len();
                let scheduled = allocator.allocate(first_slot, round.matches)?;

                match self
                    .repo
                    .append_round(competition_id, round_number, &scheduled)
                    .await?
                {
                    Some(created) => {
                        log::info!(
                            "Scheduled knockout round {} for competition {}: {} matches, bye {:?}",
                            round_number,
                            competition_id,
                            created.len(),
                            round.bye
                        );
                        Ok(BracketAdvance::RoundScheduled {
                            round_number,
                            matches: created,
                            bye: round.bye,
                        })
                    }
                    None => {
                        log::debug!(
                            "Round {} of competition {} was scheduled concurrently",
                            round_number,
                            competition_id
                        );
                        Ok(BracketAdvance::Waiting {
                            round_number,
                            remaining: pending,
                        })
                    }
                }
            }
            BracketProgress::Finished { champion } => {
                self.repo
                    .set_competition_status(competition_id, CompetitionStatus::Completed)
                    .await?;
                log::info!(
                    "Competition {} completed, champion {:?}",
                    competition_id,
                    champion
                );
                Ok(BracketAdvance::Completed { champion })
            }
        }
    }

    /// Standings for the competition, or for one group when `group_label` is given
    ///
    /// # Errors
    ///
    /// * `TournamentError::CompetitionNotFound` - Unknown competition
    /// * `TournamentError::GroupNotFound` - No group carries `group_label`
    pub async fn standings(
        &self,
        competition_id: CompetitionId,
        group_label: Option<&str>,
    ) -> TournamentResult<Vec<Standing>> {
        let registrants = self.repo.confirmed_registrants(competition_id).await?;
        let groups = self.repo.list_groups(competition_id).await?;
        let matches = self.repo.list_matches(competition_id).await?;
        let participants = bracket_participants(&registrants, &groups, &matches);

        match group_label {
            Some(label) => standings::aggregate_group(&participants, &groups, &matches, label),
            None => Ok(standings::aggregate(&participants, &groups, &matches)),
        }
    }

    /// Matches ordered by round then slot
    pub async fn list_matches(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Match>> {
        self.repo.list_matches(competition_id).await
    }

    /// Groups ordered by position
    pub async fn list_groups(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Group>> {
        self.repo.list_groups(competition_id).await
    }

    /// Expected knockout rounds once every group has a winner
    pub async fn knockout_preview(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<Vec<RoundShape>> {
        let competition = self.repo.get_competition(competition_id).await?;
        if competition.format != TournamentFormat::GroupKnockout {
            return Ok(Vec::new());
        }

        let groups = self.repo.list_groups(competition_id).await?;
        Ok(scheduler::knockout_shape(groups.len(), FIRST_KNOCKOUT_ROUND))
    }
}

fn has_progress(matches: &[Match]) -> bool {
    matches
        .iter()
        .any(|m| m.status != MatchStatus::Scheduled)
}

/// Everyone placed in the bracket, in registration order.
///
/// Registrations withdrawn after generation still count, since their matches
/// remain; they are placed after the current registrants in order of first
/// appearance.
fn bracket_participants(
    registrants: &[ParticipantId],
    groups: &[Group],
    matches: &[Match],
) -> Vec<ParticipantId> {
    let placed: HashSet<ParticipantId> = groups
        .iter()
        .flat_map(|g| g.members.iter().copied())
        .chain(matches.iter().flat_map(|m| [m.player_a, m.player_b]))
        .collect();

    let mut seen = HashSet::with_capacity(placed.len());
    registrants
        .iter()
        .copied()
        .filter(|p| placed.contains(p))
        .chain(
            groups
                .iter()
                .flat_map(|g| g.members.iter().copied())
                .chain(matches.iter().flat_map(|m| [m.player_a, m.player_b])),
        )
        .filter(|p| seen.insert(*p))
        .collect()
}
