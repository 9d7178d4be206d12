/// Property-based tests for pairing, partitioning, slot allocation and standings
///
/// These tests check the structural guarantees of generated brackets over
/// randomly sized participant pools, group sizes, table pools and results.
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use studio_tournament::tournament::{
    Group, Match, MatchStatus, SlotAllocator, partition::partition, scheduler, standings,
    state_machine::{MatchTransition, ScoreSubmission},
};

// Strategy for a pool of distinct participant ids
fn participants_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::hash_set(1i64..10_000, min..=max).prop_map(|set| set.into_iter().collect())
}

// Build persisted matches for a round-robin over `participants`
fn round_robin_matches(participants: &[i64]) -> Vec<Match> {
    let allocator = SlotAllocator::new(4, 30, Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap())
        .expect("Valid allocator");
    allocator
        .allocate(0, scheduler::round_robin(participants))
        .expect("Slots within range")
        .iter()
        .enumerate()
        .map(|(idx, scheduled)| Match::from_scheduled(idx as i64 + 1, 1, None, scheduled))
        .collect()
}

proptest! {
    #[test]
    fn test_round_robin_covers_every_pair_once(participants in participants_strategy(2, 40)) {
        let n = participants.len();
        let matches = scheduler::round_robin(&participants);
        prop_assert_eq!(matches.len(), n * (n - 1) / 2);

        let mut seen = HashSet::new();
        for m in &matches {
            prop_assert_ne!(m.player_a, m.player_b);
            let key = (m.player_a.min(m.player_b), m.player_a.max(m.player_b));
            prop_assert!(seen.insert(key), "Pair {:?} emitted twice", key);
        }
    }

    #[test]
    fn test_partition_is_total_and_disjoint(
        participants in participants_strategy(2, 60),
        group_size in 2usize..8,
        seed in any::<u64>(),
    ) {
        let groups = partition(&participants, group_size, seed).unwrap();

        let mut members: Vec<i64> = groups.iter().flat_map(|g| g.members.iter().copied()).collect();
        prop_assert_eq!(members.len(), participants.len());
        members.sort_unstable();
        let mut expected = participants.clone();
        expected.sort_unstable();
        prop_assert_eq!(members, expected);

        for g in &groups {
            prop_assert!(g.members.len() >= 2);
        }

        let stage = scheduler::group_stage(&groups);
        let expected_matches: usize = groups
            .iter()
            .map(|g| g.members.len() * (g.members.len() - 1) / 2)
            .sum();
        prop_assert_eq!(stage.len(), expected_matches);
    }

    #[test]
    fn test_partition_is_reproducible(
        participants in participants_strategy(2, 30),
        group_size in 2usize..6,
        seed in any::<u64>(),
    ) {
        prop_assert_eq!(
            partition(&participants, group_size, seed).unwrap(),
            partition(&participants, group_size, seed).unwrap()
        );
    }

    #[test]
    fn test_same_table_never_double_booked(
        table_count in 1u32..12,
        interval in 1u32..120,
        first_slot in 0u32..50,
        count in 1usize..80,
    ) {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let allocator = SlotAllocator::new(table_count, interval, start).unwrap();
        let participants: Vec<i64> = (0..20).collect();
        let pending: Vec<_> = scheduler::round_robin(&participants).into_iter().take(count).collect();
        let scheduled = allocator.allocate(first_slot, pending).unwrap();

        let block = Duration::minutes(i64::from(table_count) * i64::from(interval));
        let mut by_table: HashMap<u32, Vec<_>> = HashMap::new();
        for s in &scheduled {
            prop_assert!(s.table_index < table_count);
            by_table.entry(s.table_index).or_default().push(s.scheduled_start);
        }
        for starts in by_table.values() {
            for pair in starts.windows(2) {
                let gap = pair[1] - pair[0];
                prop_assert_eq!(gap, block);
            }
        }
    }

    #[test]
    fn test_knockout_shape_ends_in_single_final(entrants in 2usize..200) {
        let shape = scheduler::knockout_shape(entrants, 2);
        prop_assert!(!shape.is_empty());
        let last = shape.last().unwrap();
        prop_assert_eq!(last.entrants, 2);
        prop_assert_eq!(last.matches, 1);

        let mut remaining = entrants;
        for round in &shape {
            prop_assert_eq!(round.entrants, remaining);
            remaining = round.matches + usize::from(round.has_bye);
        }
        prop_assert_eq!(remaining, 1);
    }

    #[test]
    fn test_standings_bounds(
        participants in participants_strategy(2, 10),
        scores in prop::collection::vec((0i64..10, 0i64..10, any::<bool>()), 45),
    ) {
        let mut matches = round_robin_matches(&participants);
        for (m, (a, b, played)) in matches.iter_mut().zip(scores) {
            if played {
                m.apply(MatchTransition::Record(ScoreSubmission::new(a, b)), Utc::now()).unwrap();
                prop_assert_eq!(m.status, MatchStatus::Completed);
                prop_assert!(m.winner.is_none_or(|w| m.involves(w)));
            }
        }

        let groups: Vec<Group> = Vec::new();
        let table = standings::aggregate(&participants, &groups, &matches);
        prop_assert_eq!(table.len(), participants.len());

        let mut ranks: Vec<u32> = table.iter().map(|s| s.overall_rank).collect();
        ranks.sort_unstable();
        prop_assert_eq!(ranks, (1..=participants.len() as u32).collect::<Vec<_>>());

        for s in &table {
            prop_assert!((0.0..=1.0).contains(&s.win_rate));
            prop_assert_eq!(s.win_rate == 0.0, s.matches_played == 0 || s.matches_won == 0);
            prop_assert_eq!(s.score_difference, s.score_for as i64 - s.score_against as i64);
            prop_assert_eq!(s.matches_played, s.matches_won + s.matches_lost + s.matches_drawn);
        }
    }
}
