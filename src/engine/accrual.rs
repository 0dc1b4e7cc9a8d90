//! Points accrual
//!
//! Validates an award request against the tenant's configuration and caps,
//! then appends exactly one ledger entry. Denials are ordinary outcomes,
//! not errors: callers must handle "no points this time" explicitly.

use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{ActionType, ActivityEntry};
use crate::store::{CappedAppend, StoreError};

use super::caps::cap_windows;
use super::{EngineError, PointsEngine};

/// Why an award request granted nothing. All benign; nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardDenial {
    /// The tenant has no (positive) points value for this action.
    NotConfigured,
    /// A daily/weekly/monthly cap for this action is exhausted.
    CapReached,
    /// The same entity already earned this user points for this action.
    DuplicateAward,
}

/// Result of an award request.
#[derive(Debug, Clone)]
pub enum AwardOutcome {
    /// One ledger entry was appended.
    Granted { points: i64, entry: ActivityEntry },
    Denied(AwardDenial),
}

impl AwardOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Points granted, zero if denied.
    pub fn points(&self) -> i64 {
        match self {
            Self::Granted { points, .. } => *points,
            Self::Denied(_) => 0,
        }
    }
}

impl PointsEngine {
    /// Award points for a user action.
    ///
    /// Passing a stable `entity_id` (post id, event id, ...) makes the call
    /// idempotent: a second award for the same entity is denied as
    /// [`AwardDenial::DuplicateAward`].
    ///
    /// Store failures surface as `Err`; callers must not assume points were
    /// granted without an explicit `Granted`.
    pub async fn award_points(
        &self,
        user_id: &str,
        action: ActionType,
        entity_id: Option<&str>,
        metadata: Option<Value>,
    ) -> Result<AwardOutcome, EngineError> {
        let settings = self.settings().await?;
        let points = settings.points_for(action);
        if points <= 0 {
            debug!(community = %self.community_id(), %action, "action not configured for points");
            return Ok(AwardOutcome::Denied(AwardDenial::NotConfigured));
        }

        if let Some(entity) = entity_id {
            let seen = self
                .store()
                .has_entry_for_entity(self.community_id(), user_id, action, entity)
                .await?;
            if seen {
                debug!(user = user_id, %action, entity, "duplicate award attempt");
                return Ok(AwardOutcome::Denied(AwardDenial::DuplicateAward));
            }
        }

        let now = self.clock().now();
        let mut entry = ActivityEntry::new(self.community_id(), user_id, points, action, now);
        if let Some(entity) = entity_id {
            entry = entry.with_entity(entity, None);
        }
        if let Some(meta) = metadata {
            entry = entry.with_metadata(meta);
        }

        let guards = cap_windows(&settings, action, now);
        let appended = if guards.is_empty() {
            self.store()
                .append_activity(&entry)
                .await
                .map(|()| CappedAppend::Appended)
        } else {
            self.store().append_activity_capped(&entry, &guards).await
        };

        // The existence check above can race; the store's uniqueness
        // constraint is the authority
        let appended = match appended {
            Err(StoreError::DuplicateEntry) => {
                debug!(user = user_id, %action, "duplicate award attempt");
                return Ok(AwardOutcome::Denied(AwardDenial::DuplicateAward));
            }
            other => other?,
        };

        match appended {
            CappedAppend::Appended => {
                info!(user = user_id, %action, points, "points granted");
                Ok(AwardOutcome::Granted { points, entry })
            }
            CappedAppend::CapExceeded => {
                debug!(user = user_id, %action, "earning cap reached");
                Ok(AwardOutcome::Denied(AwardDenial::CapReached))
            }
        }
    }

    /// One-time joining bonus. Idempotent per user.
    pub async fn award_welcome_bonus(&self, user_id: &str) -> Result<AwardOutcome, EngineError> {
        let settings = self.settings().await?;
        self.award_bonus(user_id, ActionType::Welcome, settings.welcome_bonus, user_id)
            .await
    }

    /// Referral bonus for `referrer_id`. Idempotent per referred member.
    pub async fn award_referral_bonus(
        &self,
        referrer_id: &str,
        referred_id: &str,
    ) -> Result<AwardOutcome, EngineError> {
        let settings = self.settings().await?;
        self.award_bonus(
            referrer_id,
            ActionType::Referral,
            settings.referral_bonus,
            referred_id,
        )
        .await
    }

    async fn award_bonus(
        &self,
        user_id: &str,
        action: ActionType,
        points: i64,
        entity_id: &str,
    ) -> Result<AwardOutcome, EngineError> {
        if points <= 0 {
            return Ok(AwardOutcome::Denied(AwardDenial::NotConfigured));
        }
        let seen = self
            .store()
            .has_entry_for_entity(self.community_id(), user_id, action, entity_id)
            .await?;
        if seen {
            return Ok(AwardOutcome::Denied(AwardDenial::DuplicateAward));
        }

        let now = self.clock().now();
        let entry = ActivityEntry::new(self.community_id(), user_id, points, action, now)
            .with_entity(entity_id, None);
        match self.store().append_activity(&entry).await {
            Ok(()) => {
                info!(user = user_id, %action, points, "bonus granted");
                Ok(AwardOutcome::Granted { points, entry })
            }
            Err(StoreError::DuplicateEntry) => {
                Ok(AwardOutcome::Denied(AwardDenial::DuplicateAward))
            }
            Err(e) => Err(e.into()),
        }
    }
}
