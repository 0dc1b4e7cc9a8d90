//! Leveling calculator
//!
//! Maps a cumulative point total to a level and progress toward the next
//! one. Thresholds grow triangularly: `threshold(n) = 100 * (n-1) * n / 2`,
//! so level 2 opens at 100 points, level 3 at 300, level 4 at 600, and each
//! level costs more than the last. The curve is policy, not fact - it lives
//! here alone so a tenant-specific curve can replace it later.

use serde::{Deserialize, Serialize};

/// Level plus progress toward the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    /// Current level, starting at 1.
    pub level: u32,
    /// Progress toward the next level, 0..=100.
    pub progress_percent: u8,
}

/// Points required to reach level `n`.
fn threshold(n: u32) -> i64 {
    let n = n as i64;
    100 * (n - 1) * n / 2
}

/// Compute level and progress for a cumulative point total.
///
/// Pure and cheap (closed form); called on every render of points UI.
/// Negative totals (corrective entries can dip below zero) clamp to 0.
pub fn level_of(total_points: i64) -> LevelProgress {
    let total = total_points.max(0);

    // Invert threshold(n) <= total: n^2 - n - total/50 <= 0
    let mut level = ((1.0 + (1.0 + total as f64 / 12.5).sqrt()) / 2.0).floor() as u32;
    level = level.max(1);
    // Float rounding near a boundary can land one off; settle exactly
    while threshold(level + 1) <= total {
        level += 1;
    }
    while level > 1 && threshold(level) > total {
        level -= 1;
    }

    let floor = threshold(level);
    let span = threshold(level + 1) - floor;
    let progress_percent = (100 * (total - floor) / span) as u8;

    LevelProgress {
        level,
        progress_percent,
    }
}
