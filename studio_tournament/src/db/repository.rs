//! Repository trait for competition persistence.
//!
//! The engine never touches SQL directly: everything it reads or writes goes
//! through [`CompetitionRepository`], which keeps the scheduling and standings
//! code testable against [`super::memory::InMemoryCompetitionRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use super::timeouts::{GENERATION_TIMEOUT, with_query_timeout, with_timeout};
use crate::tournament::{
    BracketPlan, Competition, CompetitionId, CompetitionStatus, Group, GroupId, Match, MatchId,
    MatchStatus, MatchTransition, ParticipantId, ScheduledMatch, TournamentError, TournamentResult,
};

/// Trait for competition repository operations
#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    /// Get competition by ID
    async fn get_competition(&self, competition_id: CompetitionId) -> TournamentResult<Competition>;

    /// Confirmed registrants ordered by registration time
    async fn confirmed_registrants(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<Vec<ParticipantId>>;

    /// Atomically drop the competition's groups and matches, insert the
    /// planned ones and move the competition to `in_progress`.
    ///
    /// Generation eligibility is re-checked against the locked competition
    /// row after locking its matches, so a result committed after the
    /// caller's own check still blocks the replacement and is never deleted.
    async fn replace_bracket(
        &self,
        competition_id: CompetitionId,
        plan: &BracketPlan,
    ) -> TournamentResult<(Vec<Group>, Vec<Match>)>;

    /// Insert one knockout round.
    ///
    /// Returns `None` without writing anything when the competition already
    /// has matches in `round_number` or later.
    async fn append_round(
        &self,
        competition_id: CompetitionId,
        round_number: u32,
        matches: &[ScheduledMatch],
    ) -> TournamentResult<Option<Vec<Match>>>;

    /// Groups ordered by position, members in seed order
    async fn list_groups(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Group>>;

    /// Matches ordered by round then slot
    async fn list_matches(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Match>>;

    /// Get match by ID
    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match>;

    /// Lock the match, run the state machine on it and persist the result
    async fn apply_match_transition(
        &self,
        match_id: MatchId,
        transition: MatchTransition,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match>;

    /// Overwrite the competition status
    async fn set_competition_status(
        &self,
        competition_id: CompetitionId,
        status: CompetitionStatus,
    ) -> TournamentResult<()>;
}

/// PostgreSQL implementation of `CompetitionRepository`
#[derive(Clone)]
pub struct PgCompetitionRepository {
    pool: PgPool,
}

impl PgCompetitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the competition row for the rest of the transaction
    async fn lock_competition(
        tx: &mut Transaction<'_, Postgres>,
        competition_id: CompetitionId,
    ) -> TournamentResult<Competition> {
        let row = sqlx::query(
            r#"
            SELECT id, name, format, status, table_count, slot_interval_mins,
                   start_time, generation_seed, created_by
            FROM competitions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(competition_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(TournamentError::CompetitionNotFound(competition_id))?;

        competition_from_row(&row)
    }

    async fn insert_match(
        tx: &mut Transaction<'_, Postgres>,
        competition_id: CompetitionId,
        group_id: Option<GroupId>,
        scheduled: &ScheduledMatch,
    ) -> TournamentResult<Match> {
        let row = sqlx::query(
            r#"
            INSERT INTO competition_matches
                (competition_id, group_id, player_a, player_b, match_type,
                 round_number, slot_index, table_index, scheduled_start)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(competition_id)
        .bind(group_id)
        .bind(scheduled.pairing.player_a)
        .bind(scheduled.pairing.player_b)
        .bind(scheduled.pairing.match_type.as_str())
        .bind(to_db_int("round_number", scheduled.pairing.round_number)?)
        .bind(to_db_int("slot_index", scheduled.slot_index)?)
        .bind(to_db_int("table_index", scheduled.table_index)?)
        .bind(scheduled.scheduled_start.naive_utc())
        .fetch_one(&mut **tx)
        .await?;

        Ok(Match::from_scheduled(
            row.get("id"),
            competition_id,
            group_id,
            scheduled,
        ))
    }
}

const MATCH_COLUMNS: &str = "id, competition_id, group_id, player_a, player_b, match_type, \
     round_number, slot_index, table_index, scheduled_start, status, score_a, score_b, \
     winner, actual_start, actual_end";

#[async_trait]
impl CompetitionRepository for PgCompetitionRepository {
    async fn get_competition(&self, competition_id: CompetitionId) -> TournamentResult<Competition> {
        with_query_timeout(async {
            let row = sqlx::query(
                r#"
                SELECT id, name, format, status, table_count, slot_interval_mins,
                       start_time, generation_seed, created_by
                FROM competitions
                WHERE id = $1
                "#,
            )
            .bind(competition_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TournamentError::CompetitionNotFound(competition_id))?;

            competition_from_row(&row)
        })
        .await
    }

    async fn confirmed_registrants(
        &self,
        competition_id: CompetitionId,
    ) -> TournamentResult<Vec<ParticipantId>> {
        with_query_timeout(async {
            let rows = sqlx::query(
                r#"
                SELECT participant_id
                FROM competition_registrations
                WHERE competition_id = $1 AND status = 'confirmed'
                ORDER BY registered_at, id
                "#,
            )
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(rows.iter().map(|r| r.get("participant_id")).collect())
        })
        .await
    }

    async fn replace_bracket(
        &self,
        competition_id: CompetitionId,
        plan: &BracketPlan,
    ) -> TournamentResult<(Vec<Group>, Vec<Match>)> {
        with_timeout(GENERATION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            let competition = Self::lock_competition(&mut tx, competition_id).await?;

            // Waits out in-flight result transactions so the count below sees them
            sqlx::query("SELECT id FROM competition_matches WHERE competition_id = $1 FOR UPDATE")
                .bind(competition_id)
                .execute(&mut *tx)
                .await?;

            let progressed: i64 = sqlx::query(
                r#"
                SELECT COUNT(*) AS progressed
                FROM competition_matches
                WHERE competition_id = $1 AND status <> 'scheduled'
                "#,
            )
            .bind(competition_id)
            .fetch_one(&mut *tx)
            .await?
            .get("progressed");
            competition.check_generation_allowed(progressed > 0)?;

            // Matches first, they reference groups
            sqlx::query("DELETE FROM competition_matches WHERE competition_id = $1")
                .bind(competition_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM competition_groups WHERE competition_id = $1")
                .bind(competition_id)
                .execute(&mut *tx)
                .await?;

            let mut groups = Vec::with_capacity(plan.groups.len());
            for (position, planned) in plan.groups.iter().enumerate() {
                let position = position as u32;
                let row = sqlx::query(
                    r#"
                    INSERT INTO competition_groups (competition_id, label, position)
                    VALUES ($1, $2, $3)
                    RETURNING id
                    "#,
                )
                .bind(competition_id)
                .bind(&planned.label)
                .bind(to_db_int("position", position)?)
                .fetch_one(&mut *tx)
                .await?;
                let group_id: GroupId = row.get("id");

                for (seed_position, participant) in planned.members.iter().enumerate() {
                    sqlx::query(
                        r#"
                        INSERT INTO competition_group_members (group_id, participant_id, seed_position)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(group_id)
                    .bind(participant)
                    .bind(to_db_int("seed_position", seed_position as u32)?)
                    .execute(&mut *tx)
                    .await?;
                }

                groups.push(Group {
                    id: group_id,
                    competition_id,
                    label: planned.label.clone(),
                    position,
                    members: planned.members.clone(),
                });
            }

            let mut matches = Vec::with_capacity(plan.matches.len());
            for scheduled in &plan.matches {
                let group_id = scheduled
                    .pairing
                    .group_index
                    .and_then(|idx| groups.get(idx))
                    .map(|g| g.id);
                matches.push(Self::insert_match(&mut tx, competition_id, group_id, scheduled).await?);
            }

            sqlx::query(
                r#"
                UPDATE competitions
                SET format = $2, status = $3, table_count = $4, slot_interval_mins = $5,
                    start_time = $6, generation_seed = $7, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(competition_id)
            .bind(plan.format.as_str())
            .bind(CompetitionStatus::InProgress.as_str())
            .bind(to_db_int("table_count", plan.table_count)?)
            .bind(to_db_int("slot_interval", plan.slot_interval_mins)?)
            .bind(plan.start_time.naive_utc())
            // Stored bit-for-bit; BIGINT has no unsigned variant
            .bind(plan.seed as i64)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok((groups, matches))
        })
        .await
    }

    async fn append_round(
        &self,
        competition_id: CompetitionId,
        round_number: u32,
        matches: &[ScheduledMatch],
    ) -> TournamentResult<Option<Vec<Match>>> {
        with_query_timeout(async {
            let mut tx = self.pool.begin().await?;

            let competition = Self::lock_competition(&mut tx, competition_id).await?;
            if competition.status != CompetitionStatus::InProgress {
                return Err(TournamentError::CompetitionStateConflict {
                    competition_id,
                    status: competition.status,
                });
            }

            let existing: i64 = sqlx::query(
                r#"
                SELECT COUNT(*) AS existing
                FROM competition_matches
                WHERE competition_id = $1 AND round_number >= $2
                "#,
            )
            .bind(competition_id)
            .bind(to_db_int("round_number", round_number)?)
            .fetch_one(&mut *tx)
            .await?
            .get("existing");
            if existing > 0 {
                return Ok(None);
            }

            let mut inserted = Vec::with_capacity(matches.len());
            for scheduled in matches {
                inserted.push(Self::insert_match(&mut tx, competition_id, None, scheduled).await?);
            }

            tx.commit().await?;

            Ok(Some(inserted))
        })
        .await
    }

    async fn list_groups(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Group>> {
        with_query_timeout(async {
            let group_rows = sqlx::query(
                r#"
                SELECT id, label, position
                FROM competition_groups
                WHERE competition_id = $1
                ORDER BY position
                "#,
            )
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;

            let member_rows = sqlx::query(
                r#"
                SELECT m.group_id, m.participant_id
                FROM competition_group_members m
                JOIN competition_groups g ON g.id = m.group_id
                WHERE g.competition_id = $1
                ORDER BY m.group_id, m.seed_position
                "#,
            )
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;

            let mut groups: Vec<Group> = group_rows
                .iter()
                .map(|r| Group {
                    id: r.get("id"),
                    competition_id,
                    label: r.get("label"),
                    position: from_db_int(r.get("position")),
                    members: Vec::new(),
                })
                .collect();

            for row in &member_rows {
                let group_id: GroupId = row.get("group_id");
                if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
                    group.members.push(row.get("participant_id"));
                }
            }

            Ok(groups)
        })
        .await
    }

    async fn list_matches(&self, competition_id: CompetitionId) -> TournamentResult<Vec<Match>> {
        with_query_timeout(async {
            let rows = sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM competition_matches \
                 WHERE competition_id = $1 ORDER BY round_number, slot_index"
            ))
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(match_from_row).collect()
        })
        .await
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        with_query_timeout(async {
            let row = sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM competition_matches WHERE id = $1"
            ))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;

            match_from_row(&row)
        })
        .await
    }

    async fn apply_match_transition(
        &self,
        match_id: MatchId,
        transition: MatchTransition,
        now: DateTime<Utc>,
    ) -> TournamentResult<Match> {
        with_query_timeout(async {
            let mut tx = self.pool.begin().await?;

            // A second writer blocks here until the first commits, then sees
            // the updated status and is rejected by the state machine
            let row = sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM competition_matches WHERE id = $1 FOR UPDATE"
            ))
            .bind(match_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;

            let mut m = match_from_row(&row)?;
            m.apply(transition, now)?;

            sqlx::query(
                r#"
                UPDATE competition_matches
                SET status = $2, score_a = $3, score_b = $4, winner = $5,
                    actual_start = $6, actual_end = $7
                WHERE id = $1
                "#,
            )
            .bind(match_id)
            .bind(m.status.as_str())
            .bind(m.score_a.map(score_to_db).transpose()?)
            .bind(m.score_b.map(score_to_db).transpose()?)
            .bind(m.winner)
            .bind(m.actual_start.map(|t| t.naive_utc()))
            .bind(m.actual_end.map(|t| t.naive_utc()))
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(m)
        })
        .await
    }

    async fn set_competition_status(
        &self,
        competition_id: CompetitionId,
        status: CompetitionStatus,
    ) -> TournamentResult<()> {
        with_query_timeout(async {
            let result = sqlx::query(
                "UPDATE competitions SET status = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(competition_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(TournamentError::CompetitionNotFound(competition_id));
            }
            Ok(())
        })
        .await
    }
}

/// INTEGER columns are signed; a value that does not fit is refused, never clamped
fn to_db_int(field: &'static str, value: u32) -> TournamentResult<i32> {
    i32::try_from(value).map_err(|_| TournamentError::InvalidConfig {
        field,
        reason: format!("{value} does not fit an INTEGER column"),
    })
}

fn score_to_db(score: u32) -> TournamentResult<i32> {
    i32::try_from(score).map_err(|_| TournamentError::ScoreOutOfRange(i64::from(score)))
}

fn from_db_int(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn decode_error(message: String) -> TournamentError {
    TournamentError::Database(sqlx::Error::Decode(message.into()))
}

fn competition_from_row(row: &PgRow) -> TournamentResult<Competition> {
    let format: String = row.get("format");
    let status: String = row.get("status");

    Ok(Competition {
        id: row.get("id"),
        name: row.get("name"),
        format: format.parse()?,
        status: status.parse().map_err(decode_error)?,
        table_count: from_db_int(row.get("table_count")),
        slot_interval_mins: from_db_int(row.get("slot_interval_mins")),
        start_time: row.get::<chrono::NaiveDateTime, _>("start_time").and_utc(),
        generation_seed: row
            .get::<Option<i64>, _>("generation_seed")
            .map(|seed| seed as u64),
        created_by: row.get("created_by"),
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let match_type: String = row.get("match_type");
    let status: String = row.get("status");
    let status: MatchStatus = status.parse().map_err(decode_error)?;

    Ok(Match {
        id: row.get("id"),
        competition_id: row.get("competition_id"),
        group_id: row.get("group_id"),
        player_a: row.get("player_a"),
        player_b: row.get("player_b"),
        match_type: match_type.parse().map_err(decode_error)?,
        round_number: from_db_int(row.get("round_number")),
        slot_index: from_db_int(row.get("slot_index")),
        table_index: from_db_int(row.get("table_index")),
        scheduled_start: row
            .get::<chrono::NaiveDateTime, _>("scheduled_start")
            .and_utc(),
        status,
        score_a: row.get::<Option<i32>, _>("score_a").map(from_db_int),
        score_b: row.get::<Option<i32>, _>("score_b").map(from_db_int),
        winner: row.get("winner"),
        actual_start: row
            .get::<Option<chrono::NaiveDateTime>, _>("actual_start")
            .map(|dt| dt.and_utc()),
        actual_end: row
            .get::<Option<chrono::NaiveDateTime>, _>("actual_end")
            .map(|dt| dt.and_utc()),
    })
}
