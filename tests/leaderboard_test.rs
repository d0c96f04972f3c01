//! Integration tests for leaderboard sessions

mod common;

use statsync::leaderboard::{DownloadState, LeaderboardError};
use statsync::{AvatarImage, RequestScope, ResolveState, SyncEventKind, UploadMethod};

use common::{ALICE, BOARD, BOB, Harness, ME};

#[test]
fn test_submit_before_resolve_issues_nothing() {
    let harness = Harness::new();
    let board = harness.context.leaderboard(BOARD).unwrap();

    let result = board.submit_score(1000);
    assert!(matches!(result, Err(LeaderboardError::NotResolved(_))));
    assert_eq!(harness.service.counters().issued(), 0);
    assert_eq!(harness.context.calls().in_flight(), 0);
}

#[test]
fn test_download_before_resolve_is_refused() {
    let harness = Harness::new();
    let board = harness.context.leaderboard(BOARD).unwrap();
    assert!(matches!(
        board.download(),
        Err(LeaderboardError::NotResolved(_))
    ));
    assert_eq!(harness.service.counters().downloads, 0);
}

#[test]
fn test_materialize_never_reads_in_flight_download() {
    let mut harness = Harness::new().resolved();
    let board = harness.context.leaderboard(BOARD).unwrap();

    let _pending = board.download().unwrap();
    assert!(board.materialize_entries().is_empty());
    assert_eq!(board.download_state(), DownloadState::Downloading);

    let download = board.download_range(1, 1, RequestScope::Global).unwrap();
    let first = harness.complete(download).unwrap();
    assert_eq!(first.len(), 1);

    // A newer download in flight leaves the previous snapshot in place
    harness.service.set_latency(5);
    let board = harness.context.leaderboard(BOARD).unwrap();
    let _pending = board.download_range(1, 3, RequestScope::Global).unwrap();
    harness.context.tick();
    let board = harness.context.leaderboard(BOARD).unwrap();
    let entries = board.materialize_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].subject, ALICE);
}

#[test]
fn test_download_replaces_entries_wholesale() {
    let mut harness = Harness::new().resolved();

    let board = harness.context.leaderboard(BOARD).unwrap();
    let download = board.download().unwrap();
    let all = harness.complete(download).unwrap();
    let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "cara"]);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let download = board.download_range(2, 2, RequestScope::Global).unwrap();
    let top = harness.complete(download).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].subject, BOB);
    assert_eq!(harness.context.leaderboard(BOARD).unwrap().entries(), top);
}

#[test]
fn test_keep_best_and_force_update_round_trip() {
    let mut harness = Harness::new().resolved();
    harness.service.seed_score(BOARD, ME, 800);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let worse = board.submit_score_with(100, UploadMethod::KeepBest).unwrap();
    let outcome = harness.complete(worse);
    assert!(outcome.success);
    assert!(!outcome.changed);
    assert_eq!(outcome.new_score, 800);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let forced = board.submit_score_with(100, UploadMethod::ForceUpdate).unwrap();
    let outcome = harness.complete(forced);
    assert!(outcome.success);
    assert!(outcome.changed);
    assert_eq!(outcome.new_score, 100);
    assert_eq!(outcome.new_rank, 4);
    assert_eq!(harness.service.score_of(BOARD, ME), Some(100));
}

#[test]
fn test_upload_outcome_reaches_event_stream() {
    let mut harness = Harness::new().resolved();
    harness.context.drain_events();

    let board = harness.context.leaderboard(BOARD).unwrap();
    let upload = board.submit_score(700).unwrap();
    let outcome = harness.complete(upload);

    let events: Vec<SyncEventKind> = harness
        .context
        .drain_events()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        events,
        vec![SyncEventKind::ScoreUploaded {
            leaderboard: BOARD.to_string(),
            outcome,
        }]
    );
}

#[test]
fn test_upload_io_failure_reports_unsuccessful_outcome() {
    let mut harness = Harness::new().resolved();
    harness.service.fail_next_calls(1);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let upload = board.submit_score(50).unwrap();
    let outcome = harness.complete(upload);
    assert!(!outcome.success);
    assert_eq!(harness.context.leaderboard(BOARD).unwrap().last_upload(), None);
    assert_eq!(harness.service.score_of(BOARD, ME), None);
}

#[test]
fn test_not_found_can_be_retried_under_new_name() {
    let mut harness = Harness::new();
    let board = harness.context.leaderboard(BOARD).unwrap();
    let missing = board.resolve_name("Nope");
    assert!(matches!(
        harness.complete(missing),
        Err(LeaderboardError::NotFound(_))
    ));

    let board = harness.context.leaderboard(BOARD).unwrap();
    assert_eq!(board.identity().state, ResolveState::NotFound);
    assert!(board.identity().handle.is_none());
    assert!(matches!(
        board.submit_score(1),
        Err(LeaderboardError::NotFound(_))
    ));

    let retry = board.resolve_name(BOARD);
    assert!(harness.complete(retry).is_ok());
    assert!(harness.context.leaderboard(BOARD).unwrap().is_resolved());
}

#[test]
fn test_scoped_downloads() {
    let mut harness = Harness::new().resolved();
    harness.service.seed_score(BOARD, ME, 700);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let download = board
        .download_range(-1, 1, RequestScope::GlobalAroundUser)
        .unwrap();
    let around = harness.complete(download).unwrap();
    let around: Vec<_> = around.iter().map(|e| e.subject).collect();
    assert_eq!(around, vec![ALICE, ME, BOB]);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let download = board.download_range(0, 0, RequestScope::Friends).unwrap();
    let friends = harness.complete(download).unwrap();
    let friends: Vec<_> = friends.iter().map(|e| e.subject).collect();
    assert_eq!(friends, vec![ME, BOB]);
}

#[test]
fn test_avatar_probe_retries_once_then_gives_up() {
    let mut harness = Harness::new().resolved();
    harness
        .service
        .set_avatar(ALICE, AvatarImage::solid(8, 8, [255; 4]), 1);
    harness
        .service
        .set_avatar(BOB, AvatarImage::solid(8, 8, [255; 4]), 5);

    let board = harness.context.leaderboard(BOARD).unwrap();
    let download = board.download().unwrap();
    let entries = harness.complete(download).unwrap();
    assert!(entries[0].avatar.is_some(), "one retry is enough for alice");
    assert!(entries[1].avatar.is_none(), "bob's avatar is still loading");
    assert!(entries[2].avatar.is_none(), "cara has no avatar");
}

#[test]
fn test_dropping_context_abandons_pending_results() {
    let harness = Harness::new();
    let mut resolve = harness.context.leaderboard(BOARD).unwrap().resolve();
    drop(harness);
    assert!(resolve.is_abandoned());
    assert!(futures::executor::block_on(resolve).is_err());
}
