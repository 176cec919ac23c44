//! Habit schedules: how often a habit is meant to happen, how many
//! occurrences a date window implies, and whether a completion is allowed
//! today.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::{week_window, WeekdayToken};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub frequency: Frequency,
    /// Weekdays the habit runs on; only meaningful for weekly habits.
    #[serde(default)]
    pub days: BTreeSet<WeekdayToken>,
    pub start_date: NaiveDate,
    /// Day after which the habit is inactive, when set.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Schedule {
    pub fn daily(start_date: NaiveDate) -> Self {
        Self {
            frequency: Frequency::Daily,
            days: BTreeSet::new(),
            start_date,
            end_date: None,
        }
    }

    pub fn weekly(start_date: NaiveDate, days: impl IntoIterator<Item = WeekdayToken>) -> Self {
        Self {
            frequency: Frequency::Weekly,
            days: days.into_iter().collect(),
            start_date,
            end_date: None,
        }
    }

    pub fn monthly(start_date: NaiveDate) -> Self {
        Self {
            frequency: Frequency::Monthly,
            days: BTreeSet::new(),
            start_date,
            end_date: None,
        }
    }

    /// How many occurrences the schedule implies between its start date and
    /// `window_end`, both inclusive. An inverted window is 0, never negative.
    ///
    /// Monthly habits count the days matching the start date's day-of-month;
    /// months without that day (a habit started on the 31st) contribute
    /// nothing for that month.
    pub fn expected_completions(&self, window_end: NaiveDate) -> u32 {
        let start = self.start_date;
        if start > window_end {
            return 0;
        }
        match self.frequency {
            Frequency::Daily => ((window_end - start).num_days() + 1) as u32,
            Frequency::Weekly => self
                .iter_window(window_end)
                .filter(|day| self.days.contains(&WeekdayToken::from_date(*day)))
                .count() as u32,
            Frequency::Monthly => {
                let target = start.day();
                self.iter_window(window_end)
                    .filter(|day| day.day() == target)
                    .count() as u32
            }
        }
    }

    /// Whether a completion on `date` counts toward progress. Weekly habits
    /// only earn credit on their configured weekdays; other frequencies take
    /// any day.
    pub fn counts_completion(&self, date: NaiveDate) -> bool {
        match self.frequency {
            Frequency::Weekly => self.days.contains(&WeekdayToken::from_date(date)),
            Frequency::Daily | Frequency::Monthly => true,
        }
    }

    /// Guard for marking a new completion on `today`. Only weekly habits are
    /// gated; un-marking an existing completion bypasses this entirely.
    pub fn check_completion(
        &self,
        completed: &BTreeSet<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), GateError> {
        if self.frequency != Frequency::Weekly {
            return Ok(());
        }
        if self.days.is_empty() {
            return Err(GateError::NoWeekdaysConfigured);
        }
        let token = WeekdayToken::from_date(today);
        if !self.days.contains(&token) {
            return Err(GateError::NotScheduledToday { weekday: token });
        }
        let (week_start, week_end) = week_window(today);
        if completed
            .range(week_start..=week_end)
            .next()
            .is_some()
        {
            return Err(GateError::AlreadyCompletedThisWeek { week_start });
        }
        Ok(())
    }

    fn iter_window(&self, window_end: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut cursor = self.start_date;
        std::iter::from_fn(move || {
            if cursor > window_end {
                return None;
            }
            let day = cursor;
            cursor += Duration::days(1);
            Some(day)
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("habit is not scheduled on {weekday}")]
    NotScheduledToday { weekday: WeekdayToken },
    #[error("habit already completed during the week of {week_start}")]
    AlreadyCompletedThisWeek { week_start: NaiveDate },
    #[error("weekly habit has no weekdays configured")]
    NoWeekdaysConfigured,
}
