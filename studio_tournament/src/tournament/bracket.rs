//! Knockout advancement.
//!
//! Knockout rounds are never generated up front. After each result the
//! bracket is replayed from the stored matches: group winners seed the first
//! knockout round, and each later round is formed from the previous round's
//! winners followed by its bye, if any. Because the replay only reads match
//! rows, no bracket state has to be persisted beyond the matches themselves.

use super::models::{Group, Match, MatchStatus, ParticipantId, TournamentFormat};
use super::scheduler::{FIRST_KNOCKOUT_ROUND, GROUP_STAGE_ROUND, KnockoutRound, knockout_round};
use super::standings;
use serde::{Deserialize, Serialize};

/// Where a competition's bracket stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketProgress {
    /// The latest round still has unresolved matches
    Pending { round_number: u32, remaining: usize },
    /// The latest round is resolved and this round should be scheduled
    NextRound(KnockoutRound),
    /// No further matches are needed
    Finished { champion: Option<ParticipantId> },
}

/// Participant who moves on from a resolved knockout match.
///
/// A drawn knockout match advances `player_a`, the higher-seeded side of the
/// pairing. A cancelled match advances nobody.
fn advancer(m: &Match) -> Option<ParticipantId> {
    match m.status {
        MatchStatus::Completed => match m.winner {
            Some(winner) => Some(winner),
            None => {
                log::info!(
                    "Drawn knockout match {} (round {}) advances player_a {} over {}",
                    m.id,
                    m.round_number,
                    m.player_a,
                    m.player_b
                );
                Some(m.player_a)
            }
        },
        _ => None,
    }
}

/// Replay the bracket and decide what comes next
pub fn resolve_progress(
    format: TournamentFormat,
    participants: &[ParticipantId],
    groups: &[Group],
    matches: &[Match],
) -> BracketProgress {
    let Some(latest) = matches.iter().map(|m| m.round_number).max() else {
        return BracketProgress::Pending {
            round_number: GROUP_STAGE_ROUND,
            remaining: 0,
        };
    };

    let remaining = matches
        .iter()
        .filter(|m| m.round_number == latest && !m.status.is_resolved())
        .count();
    if remaining > 0 {
        return BracketProgress::Pending {
            round_number: latest,
            remaining,
        };
    }

    match format {
        TournamentFormat::RoundRobin => {
            let champion = standings::aggregate(participants, groups, matches)
                .into_iter()
                .find(|s| s.overall_rank == 1 && s.matches_played > 0)
                .map(|s| s.participant_id);
            BracketProgress::Finished { champion }
        }
        TournamentFormat::GroupKnockout => {
            let entrants = knockout_entrants(participants, groups, matches, latest);
            match entrants.as_slice() {
                [] => BracketProgress::Finished { champion: None },
                [champion] => BracketProgress::Finished {
                    champion: Some(*champion),
                },
                _ => BracketProgress::NextRound(knockout_round(&entrants, latest + 1)),
            }
        }
    }
}

/// Entrants of the round following `through_round`
fn knockout_entrants(
    participants: &[ParticipantId],
    groups: &[Group],
    matches: &[Match],
    through_round: u32,
) -> Vec<ParticipantId> {
    let mut entrants = standings::group_winners(participants, groups, matches);

    for round_number in FIRST_KNOCKOUT_ROUND..=through_round {
        let bye = knockout_round(&entrants, round_number).bye;

        let mut round_matches: Vec<&Match> = matches
            .iter()
            .filter(|m| m.round_number == round_number)
            .collect();
        round_matches.sort_by_key(|m| m.slot_index);

        entrants = round_matches
            .into_iter()
            .filter_map(advancer)
            .chain(bye)
            .collect();
    }

    entrants
}
