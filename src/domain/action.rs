//! Point-earning action types

use serde::{Deserialize, Serialize};

/// A point-earning (or point-spending) action recorded in the ledger.
///
/// Every ledger entry is tagged with exactly one action type; caps and
/// reward tables are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Publishing a post
    Post,
    /// Commenting on a post or discussion
    Comment,
    /// Reacting to someone else's content
    Reaction,
    /// Attending an event
    EventAttendance,
    /// Completing a course
    CourseCompletion,
    /// One-time bonus on joining the community
    Welcome,
    /// Bonus for referring a new member
    Referral,
    /// Debit entry created by the redemption engine (always negative points)
    Redemption,
    /// Manual correction applied by an administrator (may be negative)
    Correction,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Reaction => "reaction",
            Self::EventAttendance => "event_attendance",
            Self::CourseCompletion => "course_completion",
            Self::Welcome => "welcome",
            Self::Referral => "referral",
            Self::Redemption => "redemption",
            Self::Correction => "correction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "reaction" => Some(Self::Reaction),
            "event_attendance" => Some(Self::EventAttendance),
            "course_completion" => Some(Self::CourseCompletion),
            "welcome" => Some(Self::Welcome),
            "referral" => Some(Self::Referral),
            "redemption" => Some(Self::Redemption),
            "correction" => Some(Self::Correction),
            _ => None,
        }
    }

    /// Actions a tenant can attach a per-period cap or reward value to.
    ///
    /// Bonuses and debits are excluded: welcome/referral amounts come from
    /// their own settings fields, and redemption debits are never capped.
    pub fn configurable() -> &'static [ActionType] {
        &[
            Self::Post,
            Self::Comment,
            Self::Reaction,
            Self::EventAttendance,
            Self::CourseCompletion,
        ]
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
