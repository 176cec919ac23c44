//! Repository traits over goal and habit records, plus an in-memory
//! implementation.
//!
//! The engine never talks to a live database directly; everything flows
//! through these traits so the backing store can be a document database, a
//! fixture map in tests, or anything in between. All scoped lookups take the
//! owning user id, matching the per-user isolation of the records.

use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;
use thiserror::Error;

use nawyk_domain::date::is_past_deadline;

use crate::model::{Goal, GoalId, Habit, HabitId, Status, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

pub trait GoalStore: Send + Sync {
    /// Unscoped lookup; the progress aggregator loads goals by id alone.
    fn load(&self, id: &GoalId) -> Result<Option<Goal>, StoreError>;

    fn find(&self, user: &UserId, id: &GoalId) -> Result<Option<Goal>, StoreError>;

    fn find_by_user(&self, user: &UserId) -> Result<Vec<Goal>, StoreError>;

    /// Active goals of `user` whose target date is strictly before `today`.
    fn find_expired_active(&self, user: &UserId, today: NaiveDate)
        -> Result<Vec<Goal>, StoreError>;

    fn upsert(&self, goal: Goal) -> Result<(), StoreError>;

    fn remove(&self, user: &UserId, id: &GoalId) -> Result<Option<Goal>, StoreError>;
}

pub trait HabitStore: Send + Sync {
    /// Unscoped lookup for cascades that follow goal → habit links.
    fn load(&self, id: &HabitId) -> Result<Option<Habit>, StoreError>;

    fn find(&self, user: &UserId, id: &HabitId) -> Result<Option<Habit>, StoreError>;

    fn find_by_user(&self, user: &UserId) -> Result<Vec<Habit>, StoreError>;

    /// Active habits of `user` with an end date strictly before `today`.
    fn find_expired_active(&self, user: &UserId, today: NaiveDate)
        -> Result<Vec<Habit>, StoreError>;

    fn upsert(&self, habit: Habit) -> Result<(), StoreError>;

    fn remove(&self, user: &UserId, id: &HabitId) -> Result<Option<Habit>, StoreError>;
}

/// Map-backed store for tests, demos and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    goals: RwLock<HashMap<GoalId, Goal>>,
    habits: RwLock<HashMap<HabitId, Habit>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GoalStore for MemoryStore {
    fn load(&self, id: &GoalId) -> Result<Option<Goal>, StoreError> {
        Ok(self.goals.read().get(id).cloned())
    }

    fn find(&self, user: &UserId, id: &GoalId) -> Result<Option<Goal>, StoreError> {
        Ok(self
            .goals
            .read()
            .get(id)
            .filter(|goal| &goal.user_id == user)
            .cloned())
    }

    fn find_by_user(&self, user: &UserId) -> Result<Vec<Goal>, StoreError> {
        let mut goals: Vec<Goal> = self
            .goals
            .read()
            .values()
            .filter(|goal| &goal.user_id == user)
            .cloned()
            .collect();
        goals.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(goals)
    }

    fn find_expired_active(
        &self,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<Vec<Goal>, StoreError> {
        let mut goals: Vec<Goal> = self
            .goals
            .read()
            .values()
            .filter(|goal| {
                &goal.user_id == user
                    && goal.status == Status::Active
                    && is_past_deadline(goal.target_date, today)
            })
            .cloned()
            .collect();
        goals.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(goals)
    }

    fn upsert(&self, goal: Goal) -> Result<(), StoreError> {
        self.goals.write().insert(goal.id.clone(), goal);
        Ok(())
    }

    fn remove(&self, user: &UserId, id: &GoalId) -> Result<Option<Goal>, StoreError> {
        let mut goals = self.goals.write();
        match goals.get(id) {
            Some(goal) if &goal.user_id == user => Ok(goals.remove(id)),
            _ => Ok(None),
        }
    }
}

impl HabitStore for MemoryStore {
    fn load(&self, id: &HabitId) -> Result<Option<Habit>, StoreError> {
        Ok(self.habits.read().get(id).cloned())
    }

    fn find(&self, user: &UserId, id: &HabitId) -> Result<Option<Habit>, StoreError> {
        Ok(self
            .habits
            .read()
            .get(id)
            .filter(|habit| &habit.user_id == user)
            .cloned())
    }

    fn find_by_user(&self, user: &UserId) -> Result<Vec<Habit>, StoreError> {
        let mut habits: Vec<Habit> = self
            .habits
            .read()
            .values()
            .filter(|habit| &habit.user_id == user)
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(habits)
    }

    fn find_expired_active(
        &self,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<Vec<Habit>, StoreError> {
        let mut habits: Vec<Habit> = self
            .habits
            .read()
            .values()
            .filter(|habit| {
                &habit.user_id == user
                    && habit.status == Status::Active
                    && habit
                        .schedule
                        .end_date
                        .map(|end| is_past_deadline(end, today))
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(habits)
    }

    fn upsert(&self, habit: Habit) -> Result<(), StoreError> {
        self.habits.write().insert(habit.id.clone(), habit);
        Ok(())
    }

    fn remove(&self, user: &UserId, id: &HabitId) -> Result<Option<Habit>, StoreError> {
        let mut habits = self.habits.write();
        match habits.get(id) {
            Some(habit) if &habit.user_id == user => Ok(habits.remove(id)),
            _ => Ok(None),
        }
    }
}
