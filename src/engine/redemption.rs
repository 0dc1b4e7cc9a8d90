//! Reward redemption
//!
//! Validation order is fixed: redemption toggle, expiry, stock, balance -
//! the first failing check names the denial. On success the four-part
//! effect (ledger debit, stock decrement, redemption row, redeem_count)
//! lands as one store transaction, so stock and the ledger can never
//! diverge under concurrent redemptions.

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{ActionType, ActivityEntry, Redemption, RedemptionStatus};
use crate::store::RedemptionApplied;

use super::{EngineError, PointsEngine};

/// Why a redemption was refused. Always surfaced to the end user with a
/// specific message; never retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemDenial {
    /// The tenant has switched the reward catalog off.
    RedemptionDisabled,
    /// The reward's redemption window has closed.
    Expired,
    /// No units left.
    OutOfStock,
    /// The user's balance does not cover the cost.
    InsufficientPoints,
}

/// Result of a redemption request.
#[derive(Debug, Clone)]
pub enum RedeemOutcome {
    Redeemed(Redemption),
    Denied(RedeemDenial),
}

impl RedeemOutcome {
    pub fn is_redeemed(&self) -> bool {
        matches!(self, Self::Redeemed(_))
    }
}

impl PointsEngine {
    /// Redeem a reward for a user.
    ///
    /// A missing reward is an error, not a denial: the caller referenced
    /// something that does not exist, which is not a user-facing outcome.
    pub async fn redeem(
        &self,
        user_id: &str,
        reward_id: Uuid,
    ) -> Result<RedeemOutcome, EngineError> {
        let settings = self.settings().await?;
        if !settings.redemption_enabled {
            debug!(community = %self.community_id(), "redemption disabled for tenant");
            return Ok(RedeemOutcome::Denied(RedeemDenial::RedemptionDisabled));
        }

        let reward = self
            .store()
            .get_reward(reward_id)
            .await?
            .ok_or(EngineError::RewardNotFound(reward_id))?;

        let now = self.clock().now();
        if reward.is_expired(now) {
            return Ok(RedeemOutcome::Denied(RedeemDenial::Expired));
        }
        if !reward.in_stock() {
            return Ok(RedeemOutcome::Denied(RedeemDenial::OutOfStock));
        }

        let balance = self
            .store()
            .total_points(self.community_id(), user_id)
            .await?;
        if balance < reward.points_cost {
            debug!(user = user_id, balance, cost = reward.points_cost, "insufficient points");
            return Ok(RedeemOutcome::Denied(RedeemDenial::InsufficientPoints));
        }

        let debit = ActivityEntry::new(
            self.community_id(),
            user_id,
            -reward.points_cost,
            ActionType::Redemption,
            now,
        )
        .with_entity(reward.id.to_string(), Some("reward".to_string()));
        let redemption =
            Redemption::pending(self.community_id(), user_id, reward.id, reward.points_cost, now);

        // The prechecks above are advisory; the transaction re-verifies
        // stock and balance, so a racing loser lands here, not in the ledger
        match self.store().apply_redemption(&debit, &redemption).await? {
            RedemptionApplied::Created(created) => {
                info!(
                    user = user_id,
                    reward = %reward.title,
                    cost = reward.points_cost,
                    "reward redeemed"
                );
                Ok(RedeemOutcome::Redeemed(created))
            }
            RedemptionApplied::OutOfStock => {
                Ok(RedeemOutcome::Denied(RedeemDenial::OutOfStock))
            }
            RedemptionApplied::InsufficientPoints => {
                Ok(RedeemOutcome::Denied(RedeemDenial::InsufficientPoints))
            }
        }
    }

    /// Move a redemption through its lifecycle (admin surface).
    ///
    /// Legal transitions: `pending -> fulfilled | cancelled | expired`,
    /// `fulfilled -> completed`. Anything else is rejected.
    pub async fn update_redemption_status(
        &self,
        id: Uuid,
        to: RedemptionStatus,
    ) -> Result<Redemption, EngineError> {
        let redemption = self
            .store()
            .get_redemption(id)
            .await?
            .ok_or(EngineError::RedemptionNotFound(id))?;

        if !redemption.status.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                from: redemption.status,
                to,
            });
        }

        self.store().set_redemption_status(id, to).await?;
        info!(
            redemption = %id,
            from = redemption.status.as_str(),
            to = to.as_str(),
            "redemption status updated"
        );
        Ok(Redemption {
            status: to,
            ..redemption
        })
    }

    /// Expire pending redemptions whose reward's expiry has passed.
    ///
    /// Returns how many were moved to `expired`.
    pub async fn sweep_expired_redemptions(&self) -> Result<usize, EngineError> {
        let now = self.clock().now();
        let pending = self
            .store()
            .list_pending_redemptions(self.community_id())
            .await?;

        let mut expired = 0;
        for redemption in pending {
            let Some(reward) = self.store().get_reward(redemption.reward_id).await? else {
                continue;
            };
            if reward.is_expired(now) {
                self.store()
                    .set_redemption_status(redemption.id, RedemptionStatus::Expired)
                    .await?;
                expired += 1;
            }
        }
        if expired > 0 {
            info!(community = %self.community_id(), expired, "expired stale redemptions");
        }
        Ok(expired)
    }
}
