//! Shared fixtures for points engine integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use chrono::{DateTime, Duration, Utc};
use tracing_subscriber::EnvFilter;

use points_engine::clock::Clock;
use points_engine::config::PointsSettings;
use points_engine::domain::{ActionType, ActivityEntry};
use points_engine::{PointsEngine, PointsStore, SqliteStore};

/// Clock that only moves when a test tells it to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Mid-day anchor so daily-cap tests control the midnight boundary.
pub fn noon() -> DateTime<Utc> {
    "2024-06-15T12:00:00Z".parse().unwrap()
}

/// Engine logs go through `tracing`; route them to the test harness so
/// `RUST_LOG=debug cargo test -- --nocapture` shows them.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Engine over a fresh in-memory store and a fixed clock.
pub fn test_engine(community: &str) -> (PointsEngine, Arc<SqliteStore>, Arc<FixedClock>) {
    init_tracing();
    let store = Arc::new(SqliteStore::open_in_memory().expect("open in-memory store"));
    let clock = FixedClock::at(noon());
    let engine = PointsEngine::with_clock(community, store.clone(), clock.clone());
    (engine, store, clock)
}

/// Fetch-or-create the tenant settings, apply `mutate`, write them back.
pub async fn configure(engine: &PointsEngine, mutate: impl FnOnce(&mut PointsSettings)) {
    let mut settings = engine.settings().await.expect("load settings");
    mutate(&mut settings);
    engine.update_settings(&settings).await.expect("save settings");
}

/// Seed a user's balance with a single corrective ledger entry.
pub async fn seed_balance(store: &SqliteStore, community: &str, user: &str, points: i64) {
    let entry = ActivityEntry::new(community, user, points, ActionType::Correction, noon());
    store.append_activity(&entry).await.expect("seed balance");
}
