//! Cap enforcement
//!
//! Read side: `has_reached_cap` answers "has this user exhausted the
//! period's allowance for this action". Write side: `cap_windows` turns the
//! tenant's cap table into the guard list the store checks atomically with
//! the ledger insert, so concurrent awards cannot slip past a cap between
//! the read and the write.

use chrono::{DateTime, Utc};

use crate::config::PointsSettings;
use crate::domain::{ActionType, Period};
use crate::store::CapWindow;

use super::{EngineError, PointsEngine};

impl PointsEngine {
    /// Whether the user has already earned the configured cap for
    /// `(action, period)`. Unconfigured caps never bind.
    pub async fn has_reached_cap(
        &self,
        user_id: &str,
        action: ActionType,
        period: Period,
    ) -> Result<bool, EngineError> {
        let settings = self.settings().await?;
        let Some(cap) = settings.cap_for(period, action) else {
            return Ok(false);
        };
        let since = period.start(self.clock().now());
        let sum = self
            .store()
            .sum_activity(self.community_id(), user_id, action, since)
            .await?;
        Ok(sum >= cap)
    }
}

/// All cap windows that apply to `action` at `now`, one per configured
/// period. Empty when the action is uncapped.
pub(crate) fn cap_windows(
    settings: &PointsSettings,
    action: ActionType,
    now: DateTime<Utc>,
) -> Vec<CapWindow> {
    Period::all()
        .into_iter()
        .filter_map(|period| {
            settings.cap_for(period, action).map(|cap| CapWindow {
                cap,
                since: period.start(now),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_caps_means_no_windows() {
        let settings = PointsSettings::default();
        let windows = cap_windows(&settings, ActionType::Comment, Utc::now());
        assert!(windows.is_empty());
    }

    #[test]
    fn test_one_window_per_configured_period() {
        let mut settings = PointsSettings::default();
        settings
            .caps
            .entry(Period::Daily)
            .or_default()
            .insert(ActionType::Comment, 50);
        settings
            .caps
            .entry(Period::Monthly)
            .or_default()
            .insert(ActionType::Comment, 500);
        // A cap on a different action must not leak in
        settings
            .caps
            .entry(Period::Weekly)
            .or_default()
            .insert(ActionType::Post, 100);

        let now = Utc::now();
        let windows = cap_windows(&settings, ActionType::Comment, now);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].cap, 50);
        assert_eq!(windows[0].since, Period::Daily.start(now));
        assert_eq!(windows[1].cap, 500);
        assert_eq!(windows[1].since, Period::Monthly.start(now));
    }
}
