//! Consecutive-day streak computation over a habit's completion history.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Compute both streaks in one pass over the completion set.
///
/// The stored longest streak is monotone: callers persist
/// `max(previous, summary.longest)` so that un-marking days never erases a
/// record already achieved.
pub fn compute(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakSummary {
    StreakSummary {
        current: current_streak(completed, today),
        longest: longest_streak(completed),
    }
}

/// Consecutive run of completed days ending at `today`. If today itself is
/// not marked the streak is 0, not yesterday's run.
pub fn current_streak(completed: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut cursor = today;
    while completed.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive days anywhere in the set.
///
/// Each date whose predecessor is absent starts a run; walking forward from
/// run starts only visits every date once, so the whole scan is linear in
/// set lookups.
pub fn longest_streak(completed: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    for &day in completed {
        if completed.contains(&(day - Duration::days(1))) {
            continue;
        }
        let mut length = 1u32;
        let mut cursor = day + Duration::days(1);
        while completed.contains(&cursor) {
            length += 1;
            cursor += Duration::days(1);
        }
        longest = longest.max(length);
    }
    longest
}
