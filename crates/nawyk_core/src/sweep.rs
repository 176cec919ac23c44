//! Expiration sweeping.
//!
//! Reads of a user's goals or habits first finalize anything whose deadline
//! has passed, so a just-expired goal already shows as completed in the
//! response that triggered the sweep. Every entity is finalized in
//! isolation: one failure is logged and the sweep moves on, and a degraded
//! (not-yet-expired) view is preferred over failing the read.

use chrono::NaiveDate;
use tracing::warn;

use crate::model::{Goal, Status, UserId};
use crate::progress::refresh_goal_progress;
use crate::store::{GoalStore, HabitStore, StoreError};

/// What a sweep actually finalized; useful for logging and assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub goals_completed: usize,
    pub habits_completed: usize,
}

/// Complete every active goal of `user` whose target date is strictly before
/// `today`, cascade completion to its linked habits, then complete active
/// habits whose own end date has passed.
pub fn sweep_expired(
    goals: &dyn GoalStore,
    habits: &dyn HabitStore,
    user: &UserId,
    today: NaiveDate,
) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    match goals.find_expired_active(user, today) {
        Ok(expired) => {
            for goal in expired {
                let goal_id = goal.id.clone();
                match finalize_goal(goals, habits, goal) {
                    Ok(()) => outcome.goals_completed += 1,
                    Err(err) => {
                        warn!(%goal_id, %err, "failed to finalize expired goal")
                    }
                }
            }
        }
        Err(err) => warn!(%user, %err, "could not query expired goals"),
    }

    // Habit-level expiration is independent of goal linkage: a habit with
    // its own end date completes even when no goal is involved.
    match habits.find_expired_active(user, today) {
        Ok(expired) => {
            for mut habit in expired {
                habit.status = Status::Completed;
                match habits.upsert(habit.clone()) {
                    Ok(()) => outcome.habits_completed += 1,
                    Err(err) => {
                        warn!(habit = %habit.id, %err, "failed to complete expired habit")
                    }
                }
            }
        }
        Err(err) => warn!(%user, %err, "could not query expired habits"),
    }

    outcome
}

/// Complete a goal and cascade to its linked habits: each habit becomes
/// completed with its end date pinned to the goal's target date, then the
/// cached progress is recomputed once more to reflect the final state.
///
/// The goal write itself propagates errors; habit cascades and the progress
/// refresh are per-entity best-effort, since partial application is the
/// accepted failure mode for multi-document cascades.
pub(crate) fn finalize_goal(
    goals: &dyn GoalStore,
    habits: &dyn HabitStore,
    mut goal: Goal,
) -> Result<(), StoreError> {
    goal.status = Status::Completed;
    goal.is_completed = true;
    goals.upsert(goal.clone())?;

    for habit_id in &goal.linked_habits {
        let result = habits.load(habit_id).and_then(|found| match found {
            Some(mut habit) => {
                habit.status = Status::Completed;
                habit.schedule.end_date = Some(goal.target_date);
                habits.upsert(habit)
            }
            None => Ok(()),
        });
        if let Err(err) = result {
            warn!(goal = %goal.id, habit = %habit_id, %err, "failed to cascade goal completion");
        }
    }

    refresh_goal_progress(goals, habits, &goal.id);
    Ok(())
}
