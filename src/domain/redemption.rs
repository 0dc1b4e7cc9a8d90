//! Redemption records and their status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a redemption.
///
/// ```text
/// pending ──> fulfilled ──> completed
///    │
///    ├──────> cancelled
///    └──────> expired        (automatic, when the reward expires first)
/// ```
///
/// `completed`, `cancelled`, and `expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Fulfilled,
    Completed,
    Cancelled,
    Expired,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fulfilled" => Some(Self::Fulfilled),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Whether moving from `self` to `to` is a legal transition.
    pub fn can_transition_to(&self, to: RedemptionStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Fulfilled)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Expired)
                | (Self::Fulfilled, Self::Completed)
        )
    }
}

/// A member's exchange of points for a reward.
///
/// Created only by the redemption engine, with `status = pending`; status
/// transitions are the only mutation path afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: Uuid,
    pub user_id: String,
    pub reward_id: Uuid,
    pub community_id: String,
    pub redeemed_at: DateTime<Utc>,
    pub status: RedemptionStatus,
    pub points_spent: i64,
}

impl Redemption {
    pub fn pending(
        community_id: impl Into<String>,
        user_id: impl Into<String>,
        reward_id: Uuid,
        points_spent: i64,
        redeemed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            reward_id,
            community_id: community_id.into(),
            redeemed_at,
            status: RedemptionStatus::Pending,
            points_spent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use RedemptionStatus::*;
        assert!(Pending.can_transition_to(Fulfilled));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Expired));
        assert!(Fulfilled.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        use RedemptionStatus::*;
        for from in [Completed, Cancelled, Expired] {
            assert!(from.is_terminal());
            for to in [Pending, Fulfilled, Completed, Cancelled, Expired] {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?} must be rejected");
            }
        }
        // No skipping straight to completed
        assert!(!Pending.can_transition_to(Completed));
    }
}
