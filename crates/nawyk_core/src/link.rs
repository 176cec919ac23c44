//! The single path through which a habit's goal link may change.
//!
//! `Habit.linked_goal_id` and `Goal.linked_habits` are two sides of one
//! relationship. Call sites never touch the goal-side set directly; they go
//! through [`move_link`], which removes the habit from the old goal, adds it
//! to the new one, and refreshes cached progress on every goal touched.

use crate::model::{GoalId, HabitId};
use crate::progress::refresh_goal_progress;
use crate::store::{GoalStore, HabitStore, StoreError};

/// Re-point the goal-side membership for `habit_id` from `old` to `new`.
///
/// The habit record itself (its `linked_goal_id`) is the caller's to write;
/// callers persist it before invoking this so a reader racing the cascade
/// sees the habit's own side first. Missing goals are skipped: the link is
/// simply gone.
pub(crate) fn move_link(
    goals: &dyn GoalStore,
    habits: &dyn HabitStore,
    habit_id: &HabitId,
    old: Option<&GoalId>,
    new: Option<&GoalId>,
) -> Result<(), StoreError> {
    if old == new {
        return Ok(());
    }

    if let Some(goal_id) = old {
        if let Some(mut goal) = goals.load(goal_id)? {
            goal.linked_habits.remove(habit_id);
            goals.upsert(goal)?;
        }
        refresh_goal_progress(goals, habits, goal_id);
    }

    if let Some(goal_id) = new {
        if let Some(mut goal) = goals.load(goal_id)? {
            goal.linked_habits.insert(habit_id.clone());
            goals.upsert(goal)?;
        }
        refresh_goal_progress(goals, habits, goal_id);
    }

    Ok(())
}
