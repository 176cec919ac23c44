//! Calendar-day helpers. Everything is anchored to UTC so that a completion
//! recorded late at night lands on the same day regardless of where the
//! request came from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Truncate a timestamp to its UTC calendar day.
pub fn day_key(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// A deadline is expired once the whole deadline day has passed; the deadline
/// day itself still counts as live.
pub fn is_past_deadline(deadline: NaiveDate, today: NaiveDate) -> bool {
    deadline < today
}

/// Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// The Sunday-through-Saturday window containing `date`, both ends inclusive.
pub fn week_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(date);
    (start, start + Duration::days(6))
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayToken {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl WeekdayToken {
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
        }
    }
}

impl From<Weekday> for WeekdayToken {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => Self::Sun,
            Weekday::Mon => Self::Mon,
            Weekday::Tue => Self::Tue,
            Weekday::Wed => Self::Wed,
            Weekday::Thu => Self::Thu,
            Weekday::Fri => Self::Fri,
            Weekday::Sat => Self::Sat,
        }
    }
}

impl fmt::Display for WeekdayToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWeekdayError(String);

impl fmt::Display for ParseWeekdayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised weekday: {}", self.0)
    }
}

impl std::error::Error for ParseWeekdayError {}

impl FromStr for WeekdayToken {
    type Err = ParseWeekdayError;

    /// Accepts short tokens ("mon") and full names ("Monday"), case
    /// insensitive, so records written by older clients still parse.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let lower = input.trim().to_ascii_lowercase();
        let token = match lower.as_str() {
            "sun" | "sunday" => Self::Sun,
            "mon" | "monday" => Self::Mon,
            "tue" | "tues" | "tuesday" => Self::Tue,
            "wed" | "wednesday" => Self::Wed,
            "thu" | "thurs" | "thursday" => Self::Thu,
            "fri" | "friday" => Self::Fri,
            "sat" | "saturday" => Self::Sat,
            _ => return Err(ParseWeekdayError(input.to_string())),
        };
        Ok(token)
    }
}
