//! Integration tests for points accrual and cap enforcement

mod common;

use chrono::Duration;

use points_engine::domain::{ActionType, Period};
use points_engine::{AwardDenial, AwardOutcome, PointsStore};

use common::{configure, test_engine};

#[tokio::test]
async fn test_daily_cap_limits_comment_points() {
    let (engine, store, _clock) = test_engine("c1");
    configure(&engine, |s| {
        s.activity_rewards.insert(ActionType::Comment, 10);
        s.caps
            .entry(Period::Daily)
            .or_default()
            .insert(ActionType::Comment, 50);
    })
    .await;

    // 6 comments in one day: first 5 earn 10 each, 6th hits the cap
    let mut granted = 0;
    for i in 0..6 {
        let outcome = engine
            .award_points("alice", ActionType::Comment, None, None)
            .await
            .unwrap();
        if i < 5 {
            assert!(outcome.is_granted(), "comment {i} should earn points");
            granted += outcome.points();
        } else {
            assert!(
                matches!(outcome, AwardOutcome::Denied(AwardDenial::CapReached)),
                "comment {i} should be capped"
            );
        }
    }
    assert_eq!(granted, 50);

    // Ledger reconstructability: balance equals the sum of granted deltas
    let balance = store.total_points("c1", "alice").await.unwrap();
    assert_eq!(balance, 50);
}

#[tokio::test]
async fn test_cap_resets_on_next_calendar_day() {
    let (engine, _store, clock) = test_engine("c1");
    configure(&engine, |s| {
        s.caps
            .entry(Period::Daily)
            .or_default()
            .insert(ActionType::Post, 10);
    })
    .await;

    let first = engine
        .award_points("bob", ActionType::Post, None, None)
        .await
        .unwrap();
    assert!(first.is_granted());
    assert!(engine
        .has_reached_cap("bob", ActionType::Post, Period::Daily)
        .await
        .unwrap());

    // Crossing midnight opens a fresh daily window
    clock.advance(Duration::hours(13));
    assert!(!engine
        .has_reached_cap("bob", ActionType::Post, Period::Daily)
        .await
        .unwrap());
    let next_day = engine
        .award_points("bob", ActionType::Post, None, None)
        .await
        .unwrap();
    assert!(next_day.is_granted());
}

#[tokio::test]
async fn test_tightest_cap_window_binds_first() {
    let (engine, store, _clock) = test_engine("c1");
    configure(&engine, |s| {
        // Daily would allow ten posts; weekly stops at three
        s.caps
            .entry(Period::Daily)
            .or_default()
            .insert(ActionType::Post, 100);
        s.caps
            .entry(Period::Weekly)
            .or_default()
            .insert(ActionType::Post, 30);
    })
    .await;

    for _ in 0..3 {
        let outcome = engine
            .award_points("alice", ActionType::Post, None, None)
            .await
            .unwrap();
        assert!(outcome.is_granted());
    }

    let fourth = engine
        .award_points("alice", ActionType::Post, None, None)
        .await
        .unwrap();
    assert!(matches!(
        fourth,
        AwardOutcome::Denied(AwardDenial::CapReached)
    ));
    assert_eq!(store.total_points("c1", "alice").await.unwrap(), 30);
}

#[tokio::test]
async fn test_unconfigured_action_is_a_noop() {
    let (engine, store, _clock) = test_engine("c1");
    configure(&engine, |s| {
        s.activity_rewards.remove(&ActionType::Reaction);
    })
    .await;

    let outcome = engine
        .award_points("alice", ActionType::Reaction, None, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        AwardOutcome::Denied(AwardDenial::NotConfigured)
    ));
    assert_eq!(store.total_points("c1", "alice").await.unwrap(), 0);
}

#[tokio::test]
async fn test_uncapped_period_never_binds() {
    let (engine, _store, _clock) = test_engine("c1");
    // Default settings configure no caps at all
    for _ in 0..20 {
        let outcome = engine
            .award_points("alice", ActionType::Comment, None, None)
            .await
            .unwrap();
        assert!(outcome.is_granted());
    }
    assert!(!engine
        .has_reached_cap("alice", ActionType::Comment, Period::Weekly)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_duplicate_entity_award_is_denied() {
    let (engine, store, _clock) = test_engine("c1");

    let first = engine
        .award_points("alice", ActionType::Post, Some("post-42"), None)
        .await
        .unwrap();
    assert!(first.is_granted());

    // Two browser tabs submitting the same post
    let second = engine
        .award_points("alice", ActionType::Post, Some("post-42"), None)
        .await
        .unwrap();
    assert!(matches!(
        second,
        AwardOutcome::Denied(AwardDenial::DuplicateAward)
    ));

    // A different post still earns
    let other = engine
        .award_points("alice", ActionType::Post, Some("post-43"), None)
        .await
        .unwrap();
    assert!(other.is_granted());

    assert_eq!(store.total_points("c1", "alice").await.unwrap(), 20);
}

#[tokio::test]
async fn test_welcome_bonus_granted_once() {
    let (engine, store, _clock) = test_engine("c1");

    let first = engine.award_welcome_bonus("newbie").await.unwrap();
    assert!(first.is_granted());
    assert_eq!(first.points(), 50);

    let again = engine.award_welcome_bonus("newbie").await.unwrap();
    assert!(matches!(
        again,
        AwardOutcome::Denied(AwardDenial::DuplicateAward)
    ));
    assert_eq!(store.total_points("c1", "newbie").await.unwrap(), 50);
}

#[tokio::test]
async fn test_referral_bonus_per_referred_member() {
    let (engine, store, _clock) = test_engine("c1");

    assert!(engine
        .award_referral_bonus("alice", "bob")
        .await
        .unwrap()
        .is_granted());
    assert!(engine
        .award_referral_bonus("alice", "carol")
        .await
        .unwrap()
        .is_granted());

    // Referring the same member twice pays nothing extra
    let repeat = engine.award_referral_bonus("alice", "bob").await.unwrap();
    assert!(matches!(
        repeat,
        AwardOutcome::Denied(AwardDenial::DuplicateAward)
    ));

    assert_eq!(store.total_points("c1", "alice").await.unwrap(), 200);
}

#[tokio::test]
async fn test_tenants_do_not_share_settings_or_ledger() {
    let (engine_a, store, _clock) = test_engine("tenant-a");
    let engine_b = points_engine::PointsEngine::with_clock(
        "tenant-b",
        store.clone(),
        common::FixedClock::at(common::noon()),
    );

    configure(&engine_a, |s| {
        s.activity_rewards.insert(ActionType::Comment, 99);
    })
    .await;

    let a = engine_a
        .award_points("alice", ActionType::Comment, None, None)
        .await
        .unwrap();
    assert_eq!(a.points(), 99);

    // Tenant B still sees the default value for comments
    let b = engine_b
        .award_points("alice", ActionType::Comment, None, None)
        .await
        .unwrap();
    assert_eq!(b.points(), 5);

    assert_eq!(store.total_points("tenant-a", "alice").await.unwrap(), 99);
    assert_eq!(store.total_points("tenant-b", "alice").await.unwrap(), 5);
}
