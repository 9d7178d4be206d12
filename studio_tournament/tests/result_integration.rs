//! Integration tests for result recording and standings.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use studio_tournament::db::{CompetitionRepository, InMemoryCompetitionRepository};
use studio_tournament::tournament::{
    Competition, CompetitionStatus, MatchStatus, TournamentError, TournamentFormat,
    TournamentManager,
};

/// Helper to create a generated round-robin competition
async fn generated_round_robin(registrants: &[i64]) -> (TournamentManager, InMemoryCompetitionRepository) {
    let repo = InMemoryCompetitionRepository::new();
    repo.insert_competition(Competition {
        id: 1,
        name: "Tuesday League".to_string(),
        format: TournamentFormat::RoundRobin,
        status: CompetitionStatus::Preparation,
        table_count: 3,
        slot_interval_mins: 25,
        start_time: Utc.with_ymd_and_hms(2026, 4, 7, 19, 0, 0).unwrap(),
        generation_seed: None,
        created_by: 3,
    })
    .await;
    repo.register_all(1, registrants.iter().copied())
        .await
        .unwrap();

    let manager = TournamentManager::new(Arc::new(repo.clone()));
    manager
        .generate_with_defaults(1)
        .await
        .expect("Generation should succeed");
    (manager, repo)
}

#[tokio::test]
async fn test_record_then_resubmit_rejected() {
    let (manager, _) = generated_round_robin(&[1, 2, 3, 4]).await;
    let target = manager.list_matches(1).await.unwrap()[0].clone();

    let recorded = manager
        .record_result(target.id, Some(3), Some(1))
        .await
        .expect("First submission should succeed");
    assert_eq!(recorded.status, MatchStatus::Completed);
    assert_eq!(recorded.winner, Some(target.player_a));
    assert!(recorded.actual_start.is_some());
    assert!(recorded.actual_end.is_some());

    let err = manager
        .record_result(target.id, Some(0), Some(5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidMatchState {
            status: MatchStatus::Completed,
            ..
        }
    ));

    let stored = manager.repository().get_match(target.id).await.unwrap();
    assert_eq!((stored.score_a, stored.score_b), (Some(3), Some(1)));
}

#[tokio::test]
async fn test_concurrent_submissions_on_same_match() {
    let (manager, _) = generated_round_robin(&[1, 2, 3]).await;
    let target = manager.list_matches(1).await.unwrap()[0].id;

    let (first, second) = tokio::join!(
        manager.record_result(target, Some(4), Some(2)),
        manager.record_result(target, Some(1), Some(6)),
    );

    let outcomes = [first, second];
    let succeeded: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let rejected = outcomes
        .iter()
        .filter(|r| matches!(r, Err(TournamentError::InvalidMatchState { .. })))
        .count();
    assert_eq!(succeeded.len(), 1, "Exactly one submission wins");
    assert_eq!(rejected, 1, "The other observes the completed match");

    let stored = manager.repository().get_match(target).await.unwrap();
    assert_eq!(stored.score_a, succeeded[0].score_a);
    assert_eq!(stored.winner, succeeded[0].winner);
}

#[tokio::test]
async fn test_bad_submissions_leave_match_scheduled() {
    let (manager, _) = generated_round_robin(&[1, 2, 3]).await;
    let matches = manager.list_matches(1).await.unwrap();
    let target = matches[0].id;

    assert!(matches!(
        manager.record_result(target, Some(2), None).await,
        Err(TournamentError::IncompleteScoreData)
    ));
    assert!(matches!(
        manager.record_result(target, Some(-3), Some(1)).await,
        Err(TournamentError::ScoreOutOfRange(-3))
    ));
    assert!(matches!(
        manager.record_result(target, Some(3_000_000_000), Some(0)).await,
        Err(TournamentError::ScoreOutOfRange(3_000_000_000))
    ));
    assert!(matches!(
        manager.record_result(9_999, Some(1), Some(0)).await,
        Err(TournamentError::MatchNotFound(9_999))
    ));

    let after = manager.list_matches(1).await.unwrap();
    assert!(after.iter().all(|m| m.status == MatchStatus::Scheduled));
}

#[tokio::test]
async fn test_draw_has_no_winner() {
    let (manager, _) = generated_round_robin(&[1, 2, 3]).await;
    let target = manager.list_matches(1).await.unwrap()[1].id;

    let drawn = manager.record_result(target, Some(2), Some(2)).await.unwrap();
    assert_eq!(drawn.status, MatchStatus::Completed);
    assert_eq!(drawn.winner, None);

    let standings = manager.standings(1, None).await.unwrap();
    let drawn_count: u32 = standings.iter().map(|s| s.matches_drawn).sum();
    assert_eq!(drawn_count, 2);
}

#[tokio::test]
async fn test_standings_follow_results() {
    let (manager, repo) = generated_round_robin(&[10, 20, 30, 40]).await;

    // Pairs: (10,20) (10,30) (10,40) (20,30) (20,40) (30,40)
    let scores = [(3, 1), (2, 0), (0, 1), (2, 2), (4, 0), (1, 3)];
    let matches = manager.list_matches(1).await.unwrap();
    for (m, (a, b)) in matches.iter().zip(scores) {
        manager.record_result(m.id, Some(a), Some(b)).await.unwrap();
    }

    let standings = manager.standings(1, None).await.unwrap();
    let ranked: Vec<(i64, u32)> = standings
        .iter()
        .map(|s| (s.participant_id, s.overall_rank))
        .collect();
    // 10: 2 wins (+3), 40: 2 wins (-1), 20: 1 win, 30: 0 wins
    assert!(ranked.contains(&(10, 1)));
    assert!(ranked.contains(&(40, 2)));
    assert!(ranked.contains(&(20, 3)));
    assert!(ranked.contains(&(30, 4)));

    for s in &standings {
        assert_eq!(s.matches_played, 3);
        assert!((0.0..=1.0).contains(&s.win_rate));
        assert_eq!(
            s.score_difference,
            s.score_for as i64 - s.score_against as i64
        );
        assert_eq!(s.group_label, None);
    }

    // Every match resolved: the round-robin is over
    assert_eq!(
        repo.get_competition(1).await.unwrap().status,
        CompetitionStatus::Completed
    );
}

#[tokio::test]
async fn test_unplayed_participants_have_zero_win_rate() {
    let (manager, _) = generated_round_robin(&[1, 2, 3, 4, 5]).await;
    let first = manager.list_matches(1).await.unwrap()[0].clone();
    manager.record_result(first.id, Some(1), Some(0)).await.unwrap();

    for s in manager.standings(1, None).await.unwrap() {
        if first.involves(s.participant_id) {
            assert_eq!(s.matches_played, 1);
        } else {
            assert_eq!(s.matches_played, 0);
            assert_eq!(s.win_rate, 0.0);
        }
    }
}

#[tokio::test]
async fn test_unknown_group_label() {
    let (manager, _) = generated_round_robin(&[1, 2, 3]).await;
    assert!(matches!(
        manager.standings(1, Some("Q")).await,
        Err(TournamentError::GroupNotFound(ref label)) if label == "Q"
    ));
}
