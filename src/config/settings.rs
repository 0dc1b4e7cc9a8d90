//! Per-tenant points configuration
//!
//! One `PointsSettings` record per community. Created lazily with defaults
//! on first use, mutated only by tenant administrators. The engine fetches
//! it per call; nothing is cached process-wide, so tenants cannot leak
//! configuration into one another.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::{ActionType, Period};

/// Built-in action→points table, used when a tenant has not configured
/// a value (and as the baseline for newly created tenants).
pub static DEFAULT_ACTIVITY_REWARDS: Lazy<HashMap<ActionType, i64>> = Lazy::new(|| {
    HashMap::from([
        (ActionType::Post, 10),
        (ActionType::Comment, 5),
        (ActionType::Reaction, 2),
        (ActionType::EventAttendance, 20),
        (ActionType::CourseCompletion, 50),
    ])
});

/// Per-tenant gamification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSettings {
    /// Points granted per action type. An action missing from the map (or
    /// mapped to zero) earns nothing.
    #[serde(default = "default_activity_rewards")]
    pub activity_rewards: HashMap<ActionType, i64>,

    /// Earning caps: max points per action type within a period.
    /// An absent entry means uncapped.
    #[serde(default)]
    pub caps: HashMap<Period, HashMap<ActionType, i64>>,

    /// Master switch for the reward catalog.
    #[serde(default = "default_redemption_enabled")]
    pub redemption_enabled: bool,

    /// One-time bonus granted when a member joins.
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus: i64,

    /// Bonus granted to a member for each new member they refer.
    #[serde(default = "default_referral_bonus")]
    pub referral_bonus: i64,
}

fn default_activity_rewards() -> HashMap<ActionType, i64> {
    DEFAULT_ACTIVITY_REWARDS.clone()
}

fn default_redemption_enabled() -> bool {
    true
}

fn default_welcome_bonus() -> i64 {
    50
}

fn default_referral_bonus() -> i64 {
    100
}

impl Default for PointsSettings {
    fn default() -> Self {
        Self {
            activity_rewards: default_activity_rewards(),
            caps: HashMap::new(),
            redemption_enabled: default_redemption_enabled(),
            welcome_bonus: default_welcome_bonus(),
            referral_bonus: default_referral_bonus(),
        }
    }
}

impl PointsSettings {
    /// Points value configured for an action, zero if unconfigured.
    pub fn points_for(&self, action: ActionType) -> i64 {
        self.activity_rewards.get(&action).copied().unwrap_or(0)
    }

    /// Cap configured for `(period, action)`, if any.
    pub fn cap_for(&self, period: Period, action: ActionType) -> Option<i64> {
        self.caps.get(&period).and_then(|m| m.get(&action)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_configurable_actions() {
        let settings = PointsSettings::default();
        for action in ActionType::configurable() {
            assert!(settings.points_for(*action) > 0, "{action} should have a default value");
        }
        assert_eq!(settings.points_for(ActionType::Redemption), 0);
        assert!(settings.redemption_enabled);
    }

    #[test]
    fn test_cap_lookup() {
        let mut settings = PointsSettings::default();
        assert_eq!(settings.cap_for(Period::Daily, ActionType::Comment), None);

        settings
            .caps
            .entry(Period::Daily)
            .or_default()
            .insert(ActionType::Comment, 50);
        assert_eq!(settings.cap_for(Period::Daily, ActionType::Comment), Some(50));
        assert_eq!(settings.cap_for(Period::Weekly, ActionType::Comment), None);
    }

    #[test]
    fn test_deserialize_partial_document() {
        // Documents written by older admin UIs may omit newer fields
        let settings: PointsSettings =
            serde_json::from_str(r#"{"redemption_enabled": false}"#).unwrap();
        assert!(!settings.redemption_enabled);
        assert_eq!(settings.points_for(ActionType::Post), 10);
        assert_eq!(settings.welcome_bonus, 50);
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = PointsSettings::default();
        settings
            .caps
            .entry(Period::Monthly)
            .or_default()
            .insert(ActionType::Post, 200);
        let json = serde_json::to_string(&settings).unwrap();
        let back: PointsSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cap_for(Period::Monthly, ActionType::Post), Some(200));
    }
}
