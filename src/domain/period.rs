//! Earning-cap periods

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Window over which an earning cap applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Start instant of the period containing `now`.
    ///
    /// Daily is anchored to the UTC calendar day; weekly and monthly are
    /// rolling windows (7 days, 1 calendar month).
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Daily => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or(now),
            Self::Weekly => now - Duration::days(7),
            Self::Monthly => now.checked_sub_months(Months::new(1)).unwrap_or(now),
        }
    }

    pub fn all() -> [Period; 3] {
        [Self::Daily, Self::Weekly, Self::Monthly]
    }
}
