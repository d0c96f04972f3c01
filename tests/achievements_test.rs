//! Integration tests for the achievement store

mod common;

use statsync::achievements::AchievementError;
use statsync::{AchievementRecord, StoreOutcome, SyncEventKind, achievement_id};

use common::{Harness, config};

#[test]
fn test_initialize_builds_inclusive_padded_catalog() {
    let harness = Harness::with_config(config(11));
    let store = harness.context.achievements();

    let ids: Vec<String> = store.snapshot().into_iter().map(|r| r.id).collect();
    let expected: Vec<String> = (0..=11).map(achievement_id).collect();
    assert_eq!(ids, expected);
    assert_eq!(ids[0], "ACHIEVEMENT_00");
    assert_eq!(ids[9], "ACHIEVEMENT_09");
    assert_eq!(ids[10], "ACHIEVEMENT_10");
    assert!(
        store
            .snapshot()
            .iter()
            .all(|r| *r == AchievementRecord::empty(r.id.clone()))
    );
}

#[test]
fn test_initialize_twice_does_not_double() {
    let harness = Harness::new();
    let store = harness.context.achievements();
    let before = store.snapshot();

    store.initialize(3);
    assert_eq!(store.len(), 4);
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_get_stat_unknown_identity_is_zero() {
    let harness = Harness::new().refreshed();
    let store = harness.context.achievements();

    assert_eq!(store.get_stat("ACHIEVEMENT_77"), 0);
    assert_eq!(store.get_stat(""), 0);
    assert!(matches!(
        store.try_get_stat("ACHIEVEMENT_77"),
        Err(AchievementError::UnknownAchievement(_))
    ));
}

#[test]
fn test_unlock_then_refresh_changes_only_that_record() {
    let mut harness = Harness::new().refreshed();
    let before = harness.context.achievements().snapshot();

    harness.context.achievements().unlock("ACHIEVEMENT_02").unwrap();
    let refresh = harness.context.achievements().refresh();
    let summary = harness.complete(refresh).unwrap();
    assert_eq!(summary.updated, 4);

    let after = harness.context.achievements().snapshot();
    for (old, new) in before.iter().zip(&after) {
        if old.id == "ACHIEVEMENT_02" {
            assert!(new.unlocked);
            assert_eq!(new.name, old.name);
            assert_eq!(new.stat, old.stat);
        } else {
            assert_eq!(old, new);
        }
    }
}

#[test]
fn test_mutations_mark_dirty_and_flush_commits() {
    let mut harness = Harness::new().refreshed();
    let store = harness.context.achievements();
    assert!(!store.is_dirty());

    store.unlock("ACHIEVEMENT_01").unwrap();
    store.set_stat("ACHIEVEMENT_01", 12).unwrap();
    assert!(store.is_dirty());

    let flush = harness.context.tick().flush.expect("dirty store flushes on tick");
    let outcome = harness.complete(flush);
    assert_eq!(
        outcome,
        StoreOutcome {
            ok: true,
            cleared_dirty: true
        }
    );
    assert!(!harness.context.achievements().is_dirty());
    assert_eq!(harness.service.committed("ACHIEVEMENT_01"), Some((true, 12)));
}

#[test]
fn test_failed_flush_retries_every_tick_until_success() {
    let mut harness = Harness::new().refreshed();
    harness.context.achievements().unlock("ACHIEVEMENT_00").unwrap();
    harness.service.reject_next_stores(2);

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let flush = harness.context.tick().flush.expect("still dirty");
        outcomes.push(harness.complete(flush));
    }
    assert_eq!(
        outcomes.iter().map(|o| o.ok).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    assert!(!harness.context.achievements().is_dirty());
    assert_eq!(harness.service.counters().stores, 3);
    assert!(harness.context.tick().flush.is_none());
}

#[test]
fn test_transport_failure_on_store_keeps_dirty() {
    let mut harness = Harness::new().refreshed();
    harness.context.achievements().clear("ACHIEVEMENT_03").unwrap();
    harness.service.fail_next_calls(1);

    let flush = harness.context.tick().flush.unwrap();
    let outcome = harness.complete(flush);
    assert!(!outcome.ok);
    assert_eq!(harness.service.counters().stores, 1);
    assert!(harness.context.achievements().is_dirty());
    assert!(
        harness
            .context
            .drain_events()
            .iter()
            .any(|e| matches!(e.kind, SyncEventKind::IoFailure { .. }))
    );
}

#[test]
fn test_every_store_chains_a_refresh() {
    let mut harness = Harness::new().refreshed();
    harness.context.achievements().unlock("ACHIEVEMENT_00").unwrap();
    harness.service.reject_next_stores(1);
    let refreshes_before = harness.service.counters().user_stats;

    let flush = harness.context.tick().flush.unwrap();
    harness.complete(flush);
    let flush = harness.context.tick().flush.unwrap();
    harness.complete(flush);

    assert_eq!(harness.service.counters().user_stats, refreshes_before + 2);
}

#[test]
fn test_refresh_io_failure_leaves_records() {
    let mut harness = Harness::new().refreshed();
    let before = harness.context.achievements().snapshot();
    harness.service.fail_next_calls(1);

    let refresh = harness.context.achievements().refresh();
    assert!(matches!(
        harness.complete(refresh),
        Err(AchievementError::IoFailure(_))
    ));
    assert_eq!(harness.context.achievements().snapshot(), before);
}

#[test]
fn test_identity_outside_catalog_is_unknown() {
    let harness = Harness::with_config(config(0));
    let store = harness.context.achievements();
    assert!(store.is_initialized());
    assert!(matches!(
        store.unlock("ACHIEVEMENT_01"),
        Err(AchievementError::UnknownAchievement(_))
    ));
}

#[test]
fn test_indicate_progress_emits_event() {
    let harness = Harness::new().refreshed();
    harness.context.drain_events();
    let store = harness.context.achievements();

    store.indicate_progress("ACHIEVEMENT_01", 2, 5).unwrap();
    store.indicate_progress("ACHIEVEMENT_02", 0, 0).unwrap();
    assert!(matches!(
        store.indicate_progress("ACHIEVEMENT_99", 1, 2),
        Err(AchievementError::UnknownAchievement(_))
    ));

    assert_eq!(
        harness.service.progress_reports(),
        vec![
            ("ACHIEVEMENT_01".to_string(), 2, 5),
            ("ACHIEVEMENT_02".to_string(), 0, 0)
        ]
    );
    let shown: Vec<String> = harness
        .context
        .drain_events()
        .iter()
        .map(|e| e.kind.to_string())
        .collect();
    assert_eq!(
        shown,
        vec![
            "achievement ACHIEVEMENT_01 progress 2/5".to_string(),
            "achievement ACHIEVEMENT_02 unlocked".to_string()
        ]
    );
}
