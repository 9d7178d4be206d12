//! In-memory `CompetitionRepository` for tests and embedding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::repository::CompetitionRepository;
use crate::tournament::{
    BracketPlan, Competition, CompetitionId, CompetitionStatus, Group, GroupId, Match, MatchId,
    MatchStatus, MatchTransition, ParticipantId, ScheduledMatch, TournamentError, TournamentResult,
};

#[derive(Debug, Default)]
struct State {
    competitions: HashMap<CompetitionId, Competition>,
    /// Confirmed registrants in registration order
    registrants: HashMap<CompetitionId, Vec<ParticipantId>>,
    groups: HashMap<CompetitionId, Vec<Group>>,
    matches: BTreeMap<MatchId, Match>,
    next_group_id: GroupId,
    next_match_id: MatchId,
}

impl State {
    fn competition(&self, competition_id: CompetitionId) -> TournamentResult<&Competition> {
        self.competitions
            .get(&competition_id)
            .ok_or(TournamentError::CompetitionNotFound(competition_id))
    }

    fn insert_match(
        &mut self,
        competition_id: CompetitionId,
        group_id: Option<GroupId>,
        scheduled: &ScheduledMatch,
    ) -> Match {
        self.next_match_id += 1;
        let m = Match::from_scheduled(self.next_match_id, competition_id, group_id, scheduled);
        self.matches.insert(m.id, m.clone());
        m
    }
}

/// Competition repository backed by process memory.
///
/// Every operation takes the single lock for its whole duration, which gives
/// the same atomicity the PostgreSQL transactions provide.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompetitionRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryCompetitionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a competition record
    pub async fn insert_competition(&self, competition: Competition) {
        let mut state = self.state.write().await;
        state.registrants.entry(competition.id).or_default();
        state.competitions.insert(competition.id, competition);
    }

    /// Add a confirmed registration.
    ///
    /// Duplicate registrations are stored as given so the participant pool's
    /// own deduplication can be exercised.
    pub async fn register(
        &self,
        competition_id: CompetitionId,
        participant: ParticipantId,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        state.competition(competition_id)?;
        state
            .registrants
            .entry(competition_id)
            .or_default()
            .push(participant);
        Ok(())
    }

    /// Add several confirmed registrations in order
    pub async fn register_all(
        &self,
        competition_id: CompetitionId,
        participants: impl IntoIterator<Item = ParticipantId>,
    ) -> TournamentResult<()> {
        for participant in participants {
            self.register(competition_id, participant).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CompetitionRepository for InMemoryCompetitionRepository {
    async fn get_competition(&self, competition_id: CompetitionId) -> TournamentResult<Competition> {
        self.state.read().await.competition(competition_id).cloned()
    }

    async fn confirmed_registrants(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<Vec<ParticipantId>> {
        let state = self.state.read().await;
        state.competition(competition_id)?;
        Ok(state
            .registrants
            .get(&competition_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_bracket(
        &self,
        competition_id: CompetitionId,
        plan: &BracketPlan,
    ) -> TournamentResult<(Vec<Group>, Vec<Match>)> {
        let mut state = self.state.write().await;

        let progressed = state
            .matches
            .values()
            .any(|m| m.competition_id == competition_id && m.status != MatchStatus::Scheduled);
        state
            .competition(competition_id)?
            .check_generation_allowed(progressed)?;

        state.matches.retain(|_, m| m.competition_id != competition_id);

        let mut groups = Vec::with_capacity(plan.groups.len());
        for (position, planned) in plan.groups.iter().enumerate() {
            state.next_group_id += 1;
            groups.push(Group {
                id: state.next_group_id,
                competition_id,
                label: planned.label.clone(),
                position: position as u32,
                members: planned.members.clone(),
            });
        }

        let matches = plan
            .matches
            .iter()
            .map(|scheduled| {
                let group_id = scheduled
                    .pairing
                    .group_index
                    .and_then(|idx| groups.get(idx))
                    .map(|g| g.id);
                state.insert_match(competition_id, group_id, scheduled)
            })
            .collect();

        state.groups.insert(competition_id, groups.clone());

        if let Some(competition) = state.competitions.get_mut(&competition_id) {
            competition.format = plan.format;
            competition.status = CompetitionStatus::InProgress;
            competition.table_count = plan.table_count;
            competition.slot_interval_mins = plan.slot_interval_mins;
            competition.start_time = plan.start_time;
            competition.generation_seed = Some(plan.seed);
        }

        Ok((groups, matches))
    }

    async fn append_round(
        &self,
        competition_id: CompetitionId,
        round_number: u32,
        matches: &[ScheduledMatch],
    ) -> TournamentResult<Option<Vec<Match>>> {
        let mut state = self.state.write().await;

        let competition = state.competition(competition_id)?;
        if competition.status != CompetitionStatus::InProgress {
            return Err(TournamentError::CompetitionStateConflict {
                competition_id,
                status: competition.status,
            });
        }

        let exists = state
            .matches
            .values()
            .any(|m| m.competition_id == competition_id && m.round_number >= round_number);
        if exists {
            return Ok(None);
        }

        Ok(Some(
            matches
                .iter()
                .map(|scheduled| state.insert_match(competition_id, None, scheduled))
                .collect(),
        ))
    }

    async fn list_groups(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Group>> {
        let state = self.state.read().await;
        state.competition(competition_id)?;
        Ok(state.groups.get(&competition_id).cloned().unwrap_or_default())
    }

    async fn list_matches(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Match>> {
        let state = self.state.read().await;
        state.competition(competition_id)?;

        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.competition_id == competition_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.slot_index));
        Ok(matches)
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.state
            .read()
            .await
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn apply_match_transition(
        &self,
        match_id: MatchId,
        transition: MatchTransition,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match> {
        let mut state = self.state.write().await;
        let m = state
            .matches
            .get_mut(&match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        m.apply(transition, now)?;
        Ok(m.clone())
    }

    async fn set_competition_status(
        &self,
        competition_id: CompetitionId,
        status: CompetitionStatus,
    ) -> TournamentResult<()> {
        let mut state = self.state.write().await;
        let competition = state
            .competitions
            .get_mut(&competition_id)
            .ok_or(TournamentError::CompetitionNotFound(competition_id))?;
        competition.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{
        MatchType, NewGroup, PendingMatch, ScoreSubmission, TournamentFormat,
    };

    fn competition(id: CompetitionId) -> Competition {
        Competition {
            id,
            name: format!("Competition {id}"),
            format: TournamentFormat::RoundRobin,
            status: CompetitionStatus::Registration,
            table_count: 2,
            slot_interval_mins: 30,
            start_time: Utc::now(),
            generation_seed: None,
            created_by: 1,
        }
    }

    fn plan(pairs: &[(ParticipantId, ParticipantId)]) -> BracketPlan {
        let start = Utc::now();
        BracketPlan {
            format: TournamentFormat::GroupKnockout,
            table_count: 2,
            slot_interval_mins: 30,
            start_time: start,
            seed: 99,
            groups: vec![NewGroup {
                label: "A".to_string(),
                members: pairs.iter().flat_map(|&(a, b)| [a, b]).collect(),
            }],
            matches: pairs
                .iter()
                .enumerate()
                .map(|(k, &(a, b))| ScheduledMatch {
                    pairing: PendingMatch {
                        player_a: a,
                        player_b: b,
                        round_number: 1,
                        match_type: MatchType::GroupStage,
                        group_index: Some(0),
                    },
                    slot_index: k as u32,
                    table_index: k as u32 % 2,
                    scheduled_start: start,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_replace_bracket_updates_competition() {
        let repo = InMemoryCompetitionRepository::new();
        repo.insert_competition(competition(1)).await;

        let (groups, matches) = repo.replace_bracket(1, &plan(&[(1, 2), (3, 4)])).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.group_id == Some(groups[0].id)));

        let stored = repo.get_competition(1).await.unwrap();
        assert_eq!(stored.status, CompetitionStatus::InProgress);
        assert_eq!(stored.format, TournamentFormat::GroupKnockout);
        assert_eq!(stored.generation_seed, Some(99));
    }

    #[tokio::test]
    async fn test_replace_bracket_discards_previous_matches() {
        let repo = InMemoryCompetitionRepository::new();
        repo.insert_competition(competition(1)).await;
        repo.insert_competition(competition(2)).await;

        repo.replace_bracket(1, &plan(&[(1, 2), (3, 4)])).await.unwrap();
        repo.replace_bracket(2, &plan(&[(5, 6)])).await.unwrap();
        repo.replace_bracket(1, &plan(&[(1, 3)])).await.unwrap();

        assert_eq!(repo.list_matches(1).await.unwrap().len(), 1);
        assert_eq!(repo.list_matches(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_bracket_rejected_after_result() {
        let repo = InMemoryCompetitionRepository::new();
        repo.insert_competition(competition(1)).await;
        let (_, matches) = repo.replace_bracket(1, &plan(&[(1, 2)])).await.unwrap();

        repo.apply_match_transition(
            matches[0].id,
            MatchTransition::Record(ScoreSubmission::new(2, 1)),
            Utc::now(),
        )
        .await
        .unwrap();

        let err = repo.replace_bracket(1, &plan(&[(1, 2)])).await.unwrap_err();
        assert!(matches!(err, TournamentError::CompetitionStateConflict { .. }));
        assert_eq!(
            repo.list_matches(1).await.unwrap()[0].status,
            MatchStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_append_round_once() {
        let repo = InMemoryCompetitionRepository::new();
        repo.insert_competition(competition(1)).await;
        let (_, matches) = repo.replace_bracket(1, &plan(&[(1, 2)])).await.unwrap();

        let mut round = plan(&[(1, 3)]).matches;
        round[0].pairing.round_number = 2;
        round[0].slot_index = matches.len() as u32;

        let first = repo.append_round(1, 2, &round).await.unwrap();
        assert_eq!(first.map(|m| m.len()), Some(1));
        assert!(repo.append_round(1, 2, &round).await.unwrap().is_none());
        assert_eq!(repo.list_matches(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let repo = InMemoryCompetitionRepository::new();
        assert!(matches!(
            repo.get_competition(5).await,
            Err(TournamentError::CompetitionNotFound(5))
        ));
        assert!(matches!(
            repo.get_match(8).await,
            Err(TournamentError::MatchNotFound(8))
        ));
        assert!(repo.register(5, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_registrants_keep_order() {
        let repo = InMemoryCompetitionRepository::new();
        repo.insert_competition(competition(1)).await;
        repo.register_all(1, [30, 10, 20]).await.unwrap();
        assert_eq!(repo.confirmed_registrants(1).await.unwrap(), vec![30, 10, 20]);
    }
}
