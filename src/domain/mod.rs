//! Core domain types for the points engine
//!
//! Plain data: ledger entries, the reward catalog, redemption records, and
//! leaderboard rows. All rows are scoped to a single community (tenant).

mod action;
mod entry;
mod period;
mod profile;
mod redemption;
mod reward;

pub use action::ActionType;
pub use entry::{ActivityEntry, TopUser};
pub use period::Period;
pub use profile::{LeaderboardEntry, UserProfile};
pub use redemption::{Redemption, RedemptionStatus};
pub use reward::{Reward, RewardType, RewardVisibility};
