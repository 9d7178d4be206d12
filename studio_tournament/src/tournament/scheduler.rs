//! Pairing generation for round-robin, group stage and knockout rounds.
//!
//! Everything here is pure: it emits [`PendingMatch`] values in a fixed
//! order and leaves tables, times and persistence to the caller.

use super::models::{MatchType, NewGroup, ParticipantId, PendingMatch, TournamentFormat};
use serde::{Deserialize, Serialize};

/// Round number of the group stage and of every round-robin match
pub const GROUP_STAGE_ROUND: u32 = 1;

/// Round number of the first knockout round
pub const FIRST_KNOCKOUT_ROUND: u32 = 2;

/// Every unordered pair `(i, j)` with `i < j`, outer index ascending
pub fn round_robin_pairs(
    members: &[ParticipantId],
) -> impl Iterator<Item = (ParticipantId, ParticipantId)> + '_ {
    members
        .iter()
        .enumerate()
        .flat_map(move |(i, &a)| members[i + 1..].iter().map(move |&b| (a, b)))
}

/// Round-robin over the whole participant list
pub fn round_robin(participants: &[ParticipantId]) -> Vec<PendingMatch> {
    round_robin_pairs(participants)
        .map(|(player_a, player_b)| PendingMatch {
            player_a,
            player_b,
            round_number: GROUP_STAGE_ROUND,
            match_type: MatchType::GroupStage,
            group_index: None,
        })
        .collect()
}

/// Round-robin inside each group, groups emitted in index order
pub fn group_stage(groups: &[NewGroup]) -> Vec<PendingMatch> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(group_index, group)| {
            round_robin_pairs(&group.members).map(move |(player_a, player_b)| PendingMatch {
                player_a,
                player_b,
                round_number: GROUP_STAGE_ROUND,
                match_type: MatchType::GroupStage,
                group_index: Some(group_index),
            })
        })
        .collect()
}

/// Matches to create at generation time.
///
/// Group+knockout generation only emits the group stage; knockout rounds are
/// built once the entrants are known (see [`super::bracket`]).
pub fn initial_matches(
    format: TournamentFormat,
    participants: &[ParticipantId],
    groups: &[NewGroup],
) -> Vec<PendingMatch> {
    match format {
        TournamentFormat::RoundRobin => round_robin(participants),
        TournamentFormat::GroupKnockout => group_stage(groups),
    }
}

/// One single-elimination round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockoutRound {
    pub round_number: u32,
    pub matches: Vec<PendingMatch>,
    /// Entrant advancing without a match when the count is odd
    pub bye: Option<ParticipantId>,
}

/// Pair consecutive entrants (0 vs 1, 2 vs 3, ...); the odd one out gets a bye
pub fn knockout_round(entrants: &[ParticipantId], round_number: u32) -> KnockoutRound {
    let match_type = if entrants.len() == 2 {
        MatchType::Final
    } else {
        MatchType::Knockout
    };

    let matches = entrants
        .chunks_exact(2)
        .map(|pair| PendingMatch {
            player_a: pair[0],
            player_b: pair[1],
            round_number,
            match_type,
            group_index: None,
        })
        .collect();

    let bye = if entrants.len() % 2 == 1 {
        entrants.last().copied()
    } else {
        None
    };

    KnockoutRound {
        round_number,
        matches,
        bye,
    }
}

/// Shape of a knockout round, independent of who plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundShape {
    pub round_number: u32,
    pub entrants: usize,
    pub matches: usize,
    pub has_bye: bool,
    pub match_type: MatchType,
}

/// Rounds a single-elimination bracket with `entrants` seeds will have
pub fn knockout_shape(entrants: usize, first_round: u32) -> Vec<RoundShape> {
    let mut rounds = Vec::new();
    let mut active = entrants;
    let mut round_number = first_round;

    while active > 1 {
        rounds.push(RoundShape {
            round_number,
            entrants: active,
            matches: active / 2,
            has_bye: active % 2 == 1,
            match_type: if active == 2 {
                MatchType::Final
            } else {
                MatchType::Knockout
            },
        });
        active = active.div_ceil(2);
        round_number += 1;
    }

    rounds
}
