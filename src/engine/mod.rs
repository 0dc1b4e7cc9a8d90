//! The points engine
//!
//! One engine instance per community, holding only injected dependencies
//! (store client, clock). No process-wide state: settings are fetched per
//! call, so tenants cannot observe each other's configuration and tests
//! can run in parallel against independent stores.

mod accrual;
mod caps;
mod leaderboard;
mod level;
mod redemption;

pub use accrual::{AwardDenial, AwardOutcome};
pub use level::{level_of, LevelProgress};
pub use redemption::{RedeemDenial, RedeemOutcome};

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::PointsSettings;
use crate::domain::RedemptionStatus;
use crate::store::{PointsStore, StoreError};

/// Failure talking to the engine's collaborators, or a caller bug.
///
/// Distinct from denials: every variant here means "the operation could not
/// be evaluated", never "the user didn't qualify". Callers surface these as
/// infrastructure errors, not as user-facing outcomes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reward {0} not found")]
    RewardNotFound(Uuid),

    #[error("redemption {0} not found")]
    RedemptionNotFound(Uuid),

    #[error("illegal redemption status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: RedemptionStatus,
        to: RedemptionStatus,
    },
}

/// Points engine for a single community.
#[derive(Clone)]
pub struct PointsEngine {
    community_id: String,
    store: Arc<dyn PointsStore>,
    clock: Arc<dyn Clock>,
}

impl PointsEngine {
    /// Create an engine for `community_id` on the wall clock.
    pub fn new(community_id: impl Into<String>, store: Arc<dyn PointsStore>) -> Self {
        Self::with_clock(community_id, store, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit time source (tests, replays).
    pub fn with_clock(
        community_id: impl Into<String>,
        store: Arc<dyn PointsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            community_id: community_id.into(),
            store,
            clock,
        }
    }

    pub fn community_id(&self) -> &str {
        &self.community_id
    }

    /// Tenant settings, created lazily with defaults on first use.
    pub async fn settings(&self) -> Result<PointsSettings, EngineError> {
        if let Some(settings) = self.store.get_settings(&self.community_id).await? {
            return Ok(settings);
        }
        let settings = PointsSettings::default();
        self.store
            .upsert_settings(&self.community_id, &settings)
            .await?;
        tracing::debug!(community = %self.community_id, "created default points settings");
        Ok(settings)
    }

    /// Replace the tenant's settings (admin surface).
    pub async fn update_settings(&self, settings: &PointsSettings) -> Result<(), EngineError> {
        self.store
            .upsert_settings(&self.community_id, settings)
            .await?;
        Ok(())
    }

    pub(crate) fn store(&self) -> &dyn PointsStore {
        self.store.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
