pub mod date;
pub mod schedule;
pub mod streak;

pub use crate::date::WeekdayToken;
pub use crate::schedule::{Frequency, GateError, Schedule};
pub use crate::streak::StreakSummary;
