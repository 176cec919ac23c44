//! Goal and habit records as the engine persists them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use nawyk_domain::schedule::Schedule;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(GoalId);
id_type!(HabitId);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Completed,
    Cancelled,
}

impl Status {
    /// Completed and cancelled records accept no further lifecycle changes.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub title: String,
    pub schedule: Schedule,
    /// Day keys on which the habit was marked done; the set keeps them
    /// deduplicated and ordered.
    #[serde(default)]
    pub completed_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub last_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub linked_goal_id: Option<GoalId>,
    pub status: Status,
}

impl Habit {
    pub fn new(id: HabitId, user_id: UserId, title: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            schedule,
            completed_dates: BTreeSet::new(),
            streak: 0,
            longest_streak: 0,
            last_completed_at: None,
            linked_goal_id: None,
            status: Status::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub title: String,
    pub target_date: NaiveDate,
    pub status: Status,
    #[serde(default)]
    pub is_completed: bool,
    /// Cached derivation of the linked habits' completion ratio, 0..=100.
    /// Recomputed by the aggregator; never authoritative.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub linked_habits: BTreeSet<HabitId>,
}

impl Goal {
    pub fn new(
        id: GoalId,
        user_id: UserId,
        title: impl Into<String>,
        target_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            target_date,
            status: Status::Active,
            is_completed: false,
            progress: 0,
            linked_habits: BTreeSet::new(),
        }
    }
}
