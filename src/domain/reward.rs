//! Reward catalog types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a reward grants when redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Free,
    Downloadable,
    Access,
    Nft,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Downloadable => "downloadable",
            Self::Access => "access",
            Self::Nft => "nft",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "downloadable" => Some(Self::Downloadable),
            "access" => Some(Self::Access),
            "nft" => Some(Self::Nft),
            _ => None,
        }
    }
}

/// Who can see a reward in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardVisibility {
    Public,
    Vip,
    Limited,
}

impl RewardVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Vip => "vip",
            Self::Limited => "limited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "vip" => Some(Self::Vip),
            "limited" => Some(Self::Limited),
            _ => None,
        }
    }
}

/// An item members can redeem points for.
///
/// Created and edited by tenant administrators; the redemption engine only
/// ever mutates `stock` and `redeem_count`, and only inside the redemption
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub community_id: String,
    pub title: String,
    pub description: String,
    pub points_cost: i64,
    pub reward_type: RewardType,
    pub visibility: RewardVisibility,
    /// Remaining units; `None` means unlimited.
    pub stock: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Cached count of successful redemptions.
    pub redeem_count: i64,
}

impl Reward {
    pub fn new(
        community_id: impl Into<String>,
        title: impl Into<String>,
        points_cost: i64,
        reward_type: RewardType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            community_id: community_id.into(),
            title: title.into(),
            description: String::new(),
            points_cost,
            reward_type,
            visibility: RewardVisibility::Public,
            stock: None,
            expires_at: None,
            redeem_count: 0,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the reward's redemption window has closed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether at least one unit remains (unlimited counts as in stock).
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }
}
