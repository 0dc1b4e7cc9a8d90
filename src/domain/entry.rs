//! Activity ledger entries
//!
//! The ledger is append-only: one immutable row per point-earning or
//! point-spending event. A user's balance is always the sum of their
//! entries, so it can be reconstructed and audited from the ledger alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionType;

/// One row in the activity ledger.
///
/// `points` may be negative for corrections and redemption debits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub community_id: String,
    pub user_id: String,
    pub points: i64,
    pub action: ActionType,
    /// Stable id of the entity that triggered the award (post id, event id,
    /// referred user id). Doubles as the duplicate-award detection key.
    pub entity_id: Option<String>,
    pub entity_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        community_id: impl Into<String>,
        user_id: impl Into<String>,
        points: i64,
        action: ActionType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            community_id: community_id.into(),
            user_id: user_id.into(),
            points,
            action,
            entity_id: None,
            entity_type: None,
            metadata: None,
            created_at,
        }
    }

    pub fn with_entity(
        mut self,
        entity_id: impl Into<String>,
        entity_type: Option<String>,
    ) -> Self {
        self.entity_id = Some(entity_id.into());
        self.entity_type = entity_type;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A single row of the leaderboard projection, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUser {
    pub user_id: String,
    pub points: i64,
}
