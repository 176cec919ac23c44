//! Progress-tracking engine for goals and habits.
//!
//! A habit carries a schedule (daily, weekly on chosen weekdays, or monthly)
//! and a set of completion days; a goal carries a deadline and a set of
//! linked habits. This crate derives streaks from completions, aggregates
//! linked habits into a cached goal progress percentage, and finalizes
//! goals/habits whose deadline has passed before any read returns them.
//!
//! Storage and time are injected: implement [`GoalStore`]/[`HabitStore`]
//! over your database (or use [`MemoryStore`]) and hand a [`Clock`] to the
//! [`HabitService`] builder.

pub mod clock;
pub mod error;
pub mod model;
pub mod progress;
pub mod service;
pub mod store;
pub mod sweep;

mod link;

pub use nawyk_domain::{Frequency, GateError, Schedule, StreakSummary, WeekdayToken};

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::error::{Error, Result, ValidationError};
pub use crate::model::{Goal, GoalId, Habit, HabitId, Status, UserId};
pub use crate::progress::recompute_goal_progress;
pub use crate::service::{HabitService, HabitServiceBuilder, NewGoal, NewHabit};
pub use crate::store::{GoalStore, HabitStore, MemoryStore, StoreError};
pub use crate::sweep::{sweep_expired, SweepOutcome};
