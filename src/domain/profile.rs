//! Member profile data surfaced on the leaderboard

use serde::{Deserialize, Serialize};

/// Display profile for a community member.
///
/// Owned by the excluded membership layer; the engine only reads it to
/// decorate leaderboard rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub community_id: String,
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// One leaderboard row: ledger total plus display data and derived level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub level: u32,
    pub points: i64,
}
