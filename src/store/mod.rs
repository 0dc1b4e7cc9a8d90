//! Persistence seam for the points engine
//!
//! The engine never talks to a database directly; everything goes through
//! [`PointsStore`]. The trait mirrors what the hosted platform store
//! exposes, plus the two compound operations (guarded append, redemption
//! transaction) that have to be atomic on the store side to stay correct
//! under concurrent requests.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::PointsSettings;
use crate::domain::{
    ActionType, ActivityEntry, Redemption, RedemptionStatus, Reward, TopUser, UserProfile,
};

/// Infrastructure failure talking to the store.
///
/// Distinct from engine denials: a `StoreError` means "we couldn't reach or
/// mutate the store", never "the user didn't qualify".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The ledger already holds an entry for this
    /// `(community, user, action, entity)` key. Raised by the store's
    /// uniqueness constraint, so it holds even when two appends race.
    #[error("ledger already has an entry for this entity")]
    DuplicateEntry,

    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// One earning-cap window to verify before an append.
#[derive(Debug, Clone, Copy)]
pub struct CapWindow {
    /// Max points for this action within the window.
    pub cap: i64,
    /// Start of the window.
    pub since: DateTime<Utc>,
}

/// Outcome of a cap-guarded ledger append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CappedAppend {
    Appended,
    /// At least one window's sum had already reached its cap; nothing was
    /// written.
    CapExceeded,
}

/// Outcome of the atomic redemption transaction.
#[derive(Debug, Clone)]
pub enum RedemptionApplied {
    Created(Redemption),
    /// The conditional stock decrement found no units left; nothing was
    /// written.
    OutOfStock,
    /// The in-transaction balance recheck came up short; nothing was
    /// written.
    InsufficientPoints,
}

/// Abstract store the engine runs against.
///
/// All operations are scoped by community id where relevant; the store
/// itself may serve many tenants.
#[async_trait]
pub trait PointsStore: Send + Sync {
    // -- settings -----------------------------------------------------------

    async fn get_settings(&self, community_id: &str) -> Result<Option<PointsSettings>, StoreError>;

    async fn upsert_settings(
        &self,
        community_id: &str,
        settings: &PointsSettings,
    ) -> Result<(), StoreError>;

    // -- activity ledger ----------------------------------------------------

    /// Append one immutable ledger entry.
    ///
    /// Fails with [`StoreError::DuplicateEntry`] when the entry carries an
    /// `entity_id` that already earned this user points for this action.
    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), StoreError>;

    /// Append `entry` only if, for every window in `guards`, the sum of
    /// points already recorded for `(community, user, action)` since
    /// `window.since` is still below `window.cap`.
    ///
    /// Check and insert happen in one store-side transaction so concurrent
    /// awards cannot slip past a cap between read and write.
    async fn append_activity_capped(
        &self,
        entry: &ActivityEntry,
        guards: &[CapWindow],
    ) -> Result<CappedAppend, StoreError>;

    /// Sum of points for `(community, user, action)` with `created_at >= since`.
    async fn sum_activity(
        &self,
        community_id: &str,
        user_id: &str,
        action: ActionType,
        since: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Cumulative balance: sum of all ledger entries for the user.
    async fn total_points(&self, community_id: &str, user_id: &str) -> Result<i64, StoreError>;

    /// Whether an entry for `(community, user, action, entity)` already
    /// exists. Duplicate-award detection key.
    async fn has_entry_for_entity(
        &self,
        community_id: &str,
        user_id: &str,
        action: ActionType,
        entity_id: &str,
    ) -> Result<bool, StoreError>;

    // -- reward catalog -----------------------------------------------------

    async fn get_reward(&self, id: Uuid) -> Result<Option<Reward>, StoreError>;

    /// Insert or replace a reward (admin surface).
    async fn put_reward(&self, reward: &Reward) -> Result<(), StoreError>;

    // -- redemptions --------------------------------------------------------

    /// Atomically apply the four-part redemption effect: conditional stock
    /// decrement, ledger debit, redemption row, redeem_count bump. Either
    /// all four land or none do.
    async fn apply_redemption(
        &self,
        debit: &ActivityEntry,
        redemption: &Redemption,
    ) -> Result<RedemptionApplied, StoreError>;

    async fn get_redemption(&self, id: Uuid) -> Result<Option<Redemption>, StoreError>;

    async fn set_redemption_status(
        &self,
        id: Uuid,
        status: RedemptionStatus,
    ) -> Result<(), StoreError>;

    /// Pending redemptions for a community, oldest first.
    async fn list_pending_redemptions(
        &self,
        community_id: &str,
    ) -> Result<Vec<Redemption>, StoreError>;

    // -- leaderboard --------------------------------------------------------

    /// Top users by cumulative points, descending; ties broken by whoever
    /// reached their total first in ledger order.
    async fn list_top_users(
        &self,
        community_id: &str,
        limit: usize,
    ) -> Result<Vec<TopUser>, StoreError>;

    async fn get_profile(
        &self,
        community_id: &str,
        user_id: &str,
    ) -> Result<Option<UserProfile>, StoreError>;

    async fn put_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;
}
