//! Leaderboard projection
//!
//! Read-only ranking recomputed from the ledger on demand; nothing is
//! materialized, so the ranking can never go stale against the ledger.

use crate::domain::LeaderboardEntry;

use super::level::level_of;
use super::{EngineError, PointsEngine};

impl PointsEngine {
    /// Top `limit` users by cumulative points, decorated with profile data
    /// and derived level. Ties go to whoever reached the total first.
    pub async fn get_leaderboard(
        &self,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let top = self
            .store()
            .list_top_users(self.community_id(), limit)
            .await?;

        let mut entries = Vec::with_capacity(top.len());
        for user in top {
            let profile = self
                .store()
                .get_profile(self.community_id(), &user.user_id)
                .await?;
            // Members without a profile row still rank; fall back to the id
            let (name, avatar_url) = match profile {
                Some(p) => (p.name, p.avatar_url),
                None => (user.user_id.clone(), None),
            };
            entries.push(LeaderboardEntry {
                level: level_of(user.points).level,
                user_id: user.user_id,
                name,
                avatar_url,
                points: user.points,
            });
        }
        Ok(entries)
    }
}
