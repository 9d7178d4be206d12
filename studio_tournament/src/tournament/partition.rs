//! Seeded partitioning of participants into groups.

use super::errors::{TournamentError, TournamentResult};
use super::models::{NewGroup, ParticipantId, group_label};
use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Smallest group the partitioner will emit
pub const MIN_GROUP_MEMBERS: usize = 2;

/// Draw a seed from the current time
pub fn time_seed() -> u64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .map(|nanos| nanos as u64)
        .unwrap_or_else(|| now.timestamp_micros() as u64)
}

/// Deterministic RNG for a seed
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Shuffle participants and slice them into groups of `group_size`.
///
/// A trailing chunk with fewer than two members is merged into the
/// previous group, so every group ends up with at least two members.
///
/// # Errors
///
/// * `TournamentError::InvalidConfig` - `group_size` is below two
pub fn partition(
    participants: &[ParticipantId],
    group_size: usize,
    seed: u64,
) -> TournamentResult<Vec<NewGroup>> {
    if group_size < MIN_GROUP_MEMBERS {
        return Err(TournamentError::InvalidConfig {
            field: "group_size",
            reason: format!("Must be at least {MIN_GROUP_MEMBERS}, got {group_size}"),
        });
    }

    let mut shuffled = participants.to_vec();
    shuffled.shuffle(&mut seeded_rng(seed));

    let mut chunks: Vec<Vec<ParticipantId>> =
        shuffled.chunks(group_size).map(<[_]>::to_vec).collect();

    if chunks.len() > 1 && chunks.last().is_some_and(|c| c.len() < MIN_GROUP_MEMBERS) {
        if let Some(tail) = chunks.pop() {
            if let Some(previous) = chunks.last_mut() {
                previous.extend(tail);
            }
        }
    }

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(idx, members)| NewGroup {
            label: group_label(idx),
            members,
        })
        .collect())
}
