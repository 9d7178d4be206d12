//! Standings computed from completed matches.
//!
//! Nothing here is persisted; standings are recomputed from the match list on
//! every call. Ranking order is matches won, then score difference, then
//! score for, with registration order breaking any remaining tie.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Group, GroupId, Match, MatchStatus, ParticipantId, Standing};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    played: u32,
    won: u32,
    lost: u32,
    drawn: u32,
    score_for: u64,
    score_against: u64,
}

impl Tally {
    fn difference(&self) -> i64 {
        self.score_for as i64 - self.score_against as i64
    }

    fn win_rate(&self) -> f64 {
        if self.played == 0 {
            0.0
        } else {
            f64::from(self.won) / f64::from(self.played)
        }
    }
}

fn tally<'a>(
    participants: &[ParticipantId],
    matches: impl IntoIterator<Item = &'a Match>,
) -> HashMap<ParticipantId, Tally> {
    let mut tallies: HashMap<ParticipantId, Tally> =
        participants.iter().map(|p| (*p, Tally::default())).collect();

    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        let (Some(score_a), Some(score_b)) = (m.score_a, m.score_b) else {
            continue;
        };

        for (player, scored, conceded) in [(m.player_a, score_a, score_b), (m.player_b, score_b, score_a)] {
            let Some(t) = tallies.get_mut(&player) else {
                continue;
            };
            t.played += 1;
            t.score_for += u64::from(scored);
            t.score_against += u64::from(conceded);
            match m.winner {
                Some(winner) if winner == player => t.won += 1,
                Some(_) => t.lost += 1,
                None => t.drawn += 1,
            }
        }
    }

    tallies
}

fn compare(
    a: ParticipantId,
    b: ParticipantId,
    tallies: &HashMap<ParticipantId, Tally>,
    order: &HashMap<ParticipantId, usize>,
) -> Ordering {
    let ta = tallies.get(&a).copied().unwrap_or_default();
    let tb = tallies.get(&b).copied().unwrap_or_default();
    tb.won
        .cmp(&ta.won)
        .then_with(|| tb.difference().cmp(&ta.difference()))
        .then_with(|| tb.score_for.cmp(&ta.score_for))
        .then_with(|| {
            let oa = order.get(&a).copied().unwrap_or(usize::MAX);
            let ob = order.get(&b).copied().unwrap_or(usize::MAX);
            oa.cmp(&ob)
        })
}

fn ranked(
    members: &[ParticipantId],
    tallies: &HashMap<ParticipantId, Tally>,
    order: &HashMap<ParticipantId, usize>,
) -> Vec<ParticipantId> {
    let mut sorted = members.to_vec();
    sorted.sort_by(|a, b| compare(*a, *b, tallies, order));
    sorted
}

fn registration_order(participants: &[ParticipantId]) -> HashMap<ParticipantId, usize> {
    participants
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect()
}

fn group_matches(matches: &[Match], group_id: GroupId) -> impl Iterator<Item = &Match> {
    matches.iter().filter(move |m| m.group_id == Some(group_id))
}

/// Group members ranked by their group-stage results
pub fn group_ranking(
    participants: &[ParticipantId],
    group: &Group,
    matches: &[Match],
) -> Vec<ParticipantId> {
    let order = registration_order(participants);
    let tallies = tally(&group.members, group_matches(matches, group.id));
    ranked(&group.members, &tallies, &order)
}

/// First-ranked member of every group, in group order
pub fn group_winners(
    participants: &[ParticipantId],
    groups: &[Group],
    matches: &[Match],
) -> Vec<ParticipantId> {
    let mut ordered: Vec<&Group> = groups.iter().collect();
    ordered.sort_by_key(|g| g.position);
    ordered
        .into_iter()
        .filter_map(|g| group_ranking(participants, g, matches).first().copied())
        .collect()
}

/// Standings across the whole competition.
///
/// `participants` is the registration-ordered participant list. Statistics
/// cover every completed match; `group_rank` only considers the matches of
/// the participant's own group.
pub fn aggregate(participants: &[ParticipantId], groups: &[Group], matches: &[Match]) -> Vec<Standing> {
    let order = registration_order(participants);
    let tallies = tally(participants, matches);

    let overall: HashMap<ParticipantId, u32> = ranked(participants, &tallies, &order)
        .into_iter()
        .zip(1..)
        .collect();

    let mut group_info: HashMap<ParticipantId, (u32, String, u32)> = HashMap::new();
    for group in groups {
        for (member, rank) in group_ranking(participants, group, matches).into_iter().zip(1..) {
            group_info.insert(member, (group.position, group.label.clone(), rank));
        }
    }

    let mut standings: Vec<Standing> = participants
        .iter()
        .map(|p| {
            let t = tallies.get(p).copied().unwrap_or_default();
            let group = group_info.get(p);
            build_standing(
                *p,
                &t,
                group.map(|(_, label, _)| label.clone()),
                group.map(|(_, _, rank)| *rank),
                overall.get(p).copied().unwrap_or(0),
            )
        })
        .collect();

    standings.sort_by_key(|s| {
        let position = group_info
            .get(&s.participant_id)
            .map_or(u32::MAX, |(position, _, _)| *position);
        (position, s.group_rank.unwrap_or(0), s.overall_rank)
    });

    standings
}

/// Standings scoped to one group.
///
/// Statistics cover only that group's matches; `overall_rank` is taken from
/// the competition-wide standings.
///
/// # Errors
///
/// * `TournamentError::GroupNotFound` - No group carries `label`
pub fn aggregate_group(
    participants: &[ParticipantId],
    groups: &[Group],
    matches: &[Match],
    label: &str,
) -> TournamentResult<Vec<Standing>> {
    let group = groups
        .iter()
        .find(|g| g.label == label)
        .ok_or_else(|| TournamentError::GroupNotFound(label.to_string()))?;

    let overall: HashMap<ParticipantId, u32> = aggregate(participants, groups, matches)
        .into_iter()
        .map(|s| (s.participant_id, s.overall_rank))
        .collect();

    let order = registration_order(participants);
    let tallies = tally(&group.members, group_matches(matches, group.id));

    Ok(ranked(&group.members, &tallies, &order)
        .into_iter()
        .zip(1..)
        .map(|(p, rank)| {
            let t = tallies.get(&p).copied().unwrap_or_default();
            build_standing(
                p,
                &t,
                Some(group.label.clone()),
                Some(rank),
                overall.get(&p).copied().unwrap_or(0),
            )
        })
        .collect())
}

fn build_standing(
    participant_id: ParticipantId,
    t: &Tally,
    group_label: Option<String>,
    group_rank: Option<u32>,
    overall_rank: u32,
) -> Standing {
    Standing {
        participant_id,
        group_label,
        matches_played: t.played,
        matches_won: t.won,
        matches_lost: t.lost,
        matches_drawn: t.drawn,
        score_for: t.score_for,
        score_against: t.score_against,
        win_rate: t.win_rate(),
        score_difference: t.difference(),
        group_rank,
        overall_rank,
    }
}
