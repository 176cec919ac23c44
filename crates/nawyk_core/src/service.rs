//! The engine's front door: the operations the surrounding CRUD layer calls.
//!
//! Every mutation that can change a goal's progress inputs re-aggregates the
//! affected goal(s); every collection read sweeps expired entities first.

use std::sync::Arc;

use chrono::NaiveDate;

use nawyk_domain::schedule::Schedule;
use nawyk_domain::streak;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result, ValidationError};
use crate::link;
use crate::model::{Goal, GoalId, Habit, HabitId, UserId};
use crate::progress::{recompute_goal_progress, refresh_goal_progress};
use crate::store::{GoalStore, HabitStore, MemoryStore};
use crate::sweep::{finalize_goal, sweep_expired, SweepOutcome};

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub id: GoalId,
    pub title: String,
    pub target_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub id: HabitId,
    pub title: String,
    pub schedule: Schedule,
    pub linked_goal_id: Option<GoalId>,
}

pub struct HabitService {
    goals: Arc<dyn GoalStore>,
    habits: Arc<dyn HabitStore>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, thiserror::Error)]
#[error("habit service requires both a goal store and a habit store")]
pub struct BuildError;

#[derive(Default)]
pub struct HabitServiceBuilder {
    goals: Option<Arc<dyn GoalStore>>,
    habits: Option<Arc<dyn HabitStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_goal_store(mut self, store: Arc<dyn GoalStore>) -> Self {
        self.goals = Some(store);
        self
    }

    pub fn with_habit_store(mut self, store: Arc<dyn HabitStore>) -> Self {
        self.habits = Some(store);
        self
    }

    /// Use one [`MemoryStore`] for both record types.
    pub fn with_memory_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.goals = Some(store.clone());
        self.habits = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<HabitService, BuildError> {
        let (Some(goals), Some(habits)) = (self.goals, self.habits) else {
            return Err(BuildError);
        };
        Ok(HabitService {
            goals,
            habits,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    /// Fresh service over a shared in-memory store, on the system clock.
    pub fn in_memory() -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = Self::builder()
            .with_memory_store(store.clone())
            .build()
            .expect("memory store configures both sides");
        (service, store)
    }

    pub fn create_goal(&self, user: &UserId, new: NewGoal) -> Result<Goal> {
        let goal = Goal::new(new.id, user.clone(), new.title, new.target_date);
        self.goals.upsert(goal.clone())?;
        Ok(goal)
    }

    pub fn create_habit(&self, user: &UserId, new: NewHabit) -> Result<Habit> {
        if let Some(goal_id) = &new.linked_goal_id {
            self.owned_goal(user, goal_id)?;
        }
        let mut habit = Habit::new(new.id, user.clone(), new.title, new.schedule);
        habit.linked_goal_id = new.linked_goal_id.clone();
        self.habits.upsert(habit.clone())?;
        link::move_link(
            self.goals.as_ref(),
            self.habits.as_ref(),
            &habit.id,
            None,
            new.linked_goal_id.as_ref(),
        )?;
        Ok(habit)
    }

    /// Mark today done, or un-mark it if it already is. Weekly habits pass
    /// through the schedule gate before a new mark; un-marking is always
    /// allowed. Streaks are recomputed on every toggle and the linked goal's
    /// progress is refreshed.
    pub fn toggle_completion(&self, user: &UserId, habit_id: &HabitId) -> Result<Habit> {
        let mut habit = self.owned_habit(user, habit_id)?;
        if habit.status.is_terminal() {
            return Err(ValidationError::HabitNotActive {
                status: habit.status,
            }
            .into());
        }

        let today = self.clock.today();
        if habit.completed_dates.contains(&today) {
            habit.completed_dates.remove(&today);
            habit.last_completed_at = None;
        } else {
            habit
                .schedule
                .check_completion(&habit.completed_dates, today)?;
            habit.completed_dates.insert(today);
            habit.last_completed_at = Some(self.clock.now());
        }

        let summary = streak::compute(&habit.completed_dates, today);
        habit.streak = summary.current;
        // A record once reached is never un-set by removing days.
        habit.longest_streak = habit.longest_streak.max(summary.longest);

        self.habits.upsert(habit.clone())?;
        if let Some(goal_id) = &habit.linked_goal_id {
            refresh_goal_progress(self.goals.as_ref(), self.habits.as_ref(), goal_id);
        }
        Ok(habit)
    }

    /// Point the habit at a different goal (or none). Both the old and the
    /// new goal get their membership and cached progress updated.
    pub fn relink_habit(
        &self,
        user: &UserId,
        habit_id: &HabitId,
        new_goal: Option<GoalId>,
    ) -> Result<Habit> {
        let mut habit = self.owned_habit(user, habit_id)?;
        if let Some(goal_id) = &new_goal {
            self.owned_goal(user, goal_id)?;
        }
        let old_goal = habit.linked_goal_id.clone();
        if old_goal == new_goal {
            return Ok(habit);
        }

        habit.linked_goal_id = new_goal.clone();
        self.habits.upsert(habit.clone())?;
        link::move_link(
            self.goals.as_ref(),
            self.habits.as_ref(),
            habit_id,
            old_goal.as_ref(),
            new_goal.as_ref(),
        )?;
        Ok(habit)
    }

    /// Replace the habit's schedule and refresh any linked goal, since the
    /// expected-completion window just changed.
    pub fn update_schedule(
        &self,
        user: &UserId,
        habit_id: &HabitId,
        schedule: Schedule,
    ) -> Result<Habit> {
        let mut habit = self.owned_habit(user, habit_id)?;
        habit.schedule = schedule;
        self.habits.upsert(habit.clone())?;
        if let Some(goal_id) = &habit.linked_goal_id {
            refresh_goal_progress(self.goals.as_ref(), self.habits.as_ref(), goal_id);
        }
        Ok(habit)
    }

    pub fn delete_habit(&self, user: &UserId, habit_id: &HabitId) -> Result<()> {
        let removed = self
            .habits
            .remove(user, habit_id)?
            .ok_or_else(|| Error::HabitNotFound(habit_id.clone()))?;
        link::move_link(
            self.goals.as_ref(),
            self.habits.as_ref(),
            habit_id,
            removed.linked_goal_id.as_ref(),
            None,
        )?;
        Ok(())
    }

    pub fn set_target_date(
        &self,
        user: &UserId,
        goal_id: &GoalId,
        target_date: NaiveDate,
    ) -> Result<Goal> {
        let mut goal = self.owned_goal(user, goal_id)?;
        if goal.status.is_terminal() {
            return Err(ValidationError::GoalNotActive {
                status: goal.status,
            }
            .into());
        }
        goal.target_date = target_date;
        self.goals.upsert(goal)?;
        recompute_goal_progress(self.goals.as_ref(), self.habits.as_ref(), goal_id)?;
        self.owned_goal(user, goal_id)
    }

    /// Explicit completion: the same finalization the sweeper applies, so
    /// linked habits close out and progress reflects the final state.
    pub fn complete_goal(&self, user: &UserId, goal_id: &GoalId) -> Result<Goal> {
        let goal = self.owned_goal(user, goal_id)?;
        if goal.status.is_terminal() {
            return Ok(goal);
        }
        finalize_goal(self.goals.as_ref(), self.habits.as_ref(), goal)?;
        self.owned_goal(user, goal_id)
    }

    /// Delete a goal, clearing the back-reference on any habit that pointed
    /// at it. Habit-side cleanup is per-entity best-effort.
    pub fn delete_goal(&self, user: &UserId, goal_id: &GoalId) -> Result<()> {
        let removed = self
            .goals
            .remove(user, goal_id)?
            .ok_or_else(|| Error::GoalNotFound(goal_id.clone()))?;
        for habit_id in &removed.linked_habits {
            let result = self.habits.load(habit_id).and_then(|found| match found {
                Some(mut habit) => {
                    habit.linked_goal_id = None;
                    self.habits.upsert(habit)
                }
                None => Ok(()),
            });
            if let Err(err) = result {
                tracing::warn!(%goal_id, %habit_id, %err, "failed to unlink habit from deleted goal");
            }
        }
        Ok(())
    }

    /// All goals of `user`, after sweeping expirations.
    pub fn goals(&self, user: &UserId) -> Result<Vec<Goal>> {
        self.sweep_expired(user);
        Ok(self.goals.find_by_user(user)?)
    }

    /// One goal of `user`, after sweeping expirations.
    pub fn goal(&self, user: &UserId, goal_id: &GoalId) -> Result<Goal> {
        self.sweep_expired(user);
        self.owned_goal(user, goal_id)
    }

    /// All habits of `user`, after sweeping expirations.
    pub fn habits(&self, user: &UserId) -> Result<Vec<Habit>> {
        self.sweep_expired(user);
        Ok(self.habits.find_by_user(user)?)
    }

    pub fn recompute_goal_progress(&self, goal_id: &GoalId) -> Result<()> {
        recompute_goal_progress(self.goals.as_ref(), self.habits.as_ref(), goal_id)?;
        Ok(())
    }

    pub fn sweep_expired(&self, user: &UserId) -> SweepOutcome {
        sweep_expired(
            self.goals.as_ref(),
            self.habits.as_ref(),
            user,
            self.clock.today(),
        )
    }

    fn owned_goal(&self, user: &UserId, goal_id: &GoalId) -> Result<Goal> {
        self.goals
            .find(user, goal_id)?
            .ok_or_else(|| Error::GoalNotFound(goal_id.clone()))
    }

    fn owned_habit(&self, user: &UserId, habit_id: &HabitId) -> Result<Habit> {
        self.habits
            .find(user, habit_id)?
            .ok_or_else(|| Error::HabitNotFound(habit_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nawyk_domain::date::WeekdayToken;
    use nawyk_domain::schedule::GateError;

    use crate::clock::FixedClock;
    use crate::model::Status;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_on(day: NaiveDate) -> (HabitService, Arc<FixedClock>, UserId) {
        let clock = Arc::new(FixedClock::on_day(day));
        let service = HabitService::builder()
            .with_memory_store(Arc::new(MemoryStore::new()))
            .with_clock(clock.clone())
            .build()
            .expect("configured service");
        (service, clock, UserId::new("alice"))
    }

    fn daily_habit(service: &HabitService, user: &UserId, id: &str, start: NaiveDate) -> Habit {
        service
            .create_habit(
                user,
                NewHabit {
                    id: HabitId::new(id),
                    title: id.to_string(),
                    schedule: Schedule::daily(start),
                    linked_goal_id: None,
                },
            )
            .expect("create habit")
    }

    #[test]
    fn builder_requires_stores() {
        assert!(HabitService::builder().build().is_err());
    }

    #[test]
    fn toggle_marks_and_unmarks_today() {
        let today = date(2024, 3, 6);
        let (service, _, user) = service_on(today);
        let habit = daily_habit(&service, &user, "h1", date(2024, 3, 1));

        let marked = service.toggle_completion(&user, &habit.id).unwrap();
        assert!(marked.completed_dates.contains(&today));
        assert_eq!(marked.streak, 1);
        assert!(marked.last_completed_at.is_some());

        let unmarked = service.toggle_completion(&user, &habit.id).unwrap();
        assert!(!unmarked.completed_dates.contains(&today));
        assert_eq!(unmarked.streak, 0);
        assert!(unmarked.last_completed_at.is_none());
    }

    #[test]
    fn longest_streak_survives_unmarking() {
        let (service, clock, user) = service_on(date(2024, 3, 4));
        let habit = daily_habit(&service, &user, "h1", date(2024, 3, 1));

        for day in 4..=6 {
            clock.set_day(date(2024, 3, day));
            service.toggle_completion(&user, &habit.id).unwrap();
        }
        let after_run = service.habits(&user).unwrap().remove(0);
        assert_eq!(after_run.streak, 3);
        assert_eq!(after_run.longest_streak, 3);

        // Un-mark the last day: current drops, the record does not.
        let unmarked = service.toggle_completion(&user, &habit.id).unwrap();
        assert_eq!(unmarked.streak, 0);
        assert_eq!(unmarked.longest_streak, 3);
    }

    #[test]
    fn weekly_habit_rejects_wrong_weekday() {
        // 2024-03-05 is a Tuesday.
        let (service, _, user) = service_on(date(2024, 3, 5));
        let habit = service
            .create_habit(
                &user,
                NewHabit {
                    id: HabitId::new("h1"),
                    title: "gym".into(),
                    schedule: Schedule::weekly(date(2024, 3, 1), [WeekdayToken::Mon]),
                    linked_goal_id: None,
                },
            )
            .unwrap();

        let err = service.toggle_completion(&user, &habit.id).unwrap_err();
        assert_eq!(
            err,
            Error::Validation(ValidationError::Gate(GateError::NotScheduledToday {
                weekday: WeekdayToken::Tue
            }))
        );
        // No mutation happened.
        let stored = service.habits(&user).unwrap().remove(0);
        assert!(stored.completed_dates.is_empty());
    }

    #[test]
    fn weekly_habit_completes_once_per_week() {
        // Mondays 2024-03-04 and 2024-03-11.
        let (service, clock, user) = service_on(date(2024, 3, 4));
        let habit = service
            .create_habit(
                &user,
                NewHabit {
                    id: HabitId::new("h1"),
                    title: "review".into(),
                    schedule: Schedule::weekly(
                        date(2024, 3, 1),
                        [WeekdayToken::Mon, WeekdayToken::Thu],
                    ),
                    linked_goal_id: None,
                },
            )
            .unwrap();

        service.toggle_completion(&user, &habit.id).unwrap();

        // Thursday same week: gated.
        clock.set_day(date(2024, 3, 7));
        let err = service.toggle_completion(&user, &habit.id).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::Gate(
                GateError::AlreadyCompletedThisWeek { .. }
            ))
        ));

        // Next Monday: fine.
        clock.set_day(date(2024, 3, 11));
        assert!(service.toggle_completion(&user, &habit.id).is_ok());
    }

    #[test]
    fn unmarking_today_bypasses_the_weekly_gate() {
        let (service, _, user) = service_on(date(2024, 3, 4));
        let habit = service
            .create_habit(
                &user,
                NewHabit {
                    id: HabitId::new("h1"),
                    title: "review".into(),
                    schedule: Schedule::weekly(date(2024, 3, 1), [WeekdayToken::Mon]),
                    linked_goal_id: None,
                },
            )
            .unwrap();

        service.toggle_completion(&user, &habit.id).unwrap();
        let unmarked = service.toggle_completion(&user, &habit.id).unwrap();
        assert!(unmarked.completed_dates.is_empty());
    }

    #[test]
    fn completed_habit_rejects_toggles() {
        let (service, _, user) = service_on(date(2024, 3, 4));
        let habit = daily_habit(&service, &user, "h1", date(2024, 3, 1));
        let mut stored = service.habits(&user).unwrap().remove(0);
        stored.status = Status::Completed;
        service.habits.upsert(stored).unwrap();

        let err = service.toggle_completion(&user, &habit.id).unwrap_err();
        assert_eq!(
            err,
            Error::Validation(ValidationError::HabitNotActive {
                status: Status::Completed
            })
        );
    }

    #[test]
    fn linking_to_foreign_goal_is_not_found() {
        let (service, _, user) = service_on(date(2024, 3, 4));
        let goal = service
            .create_goal(
                &UserId::new("bob"),
                NewGoal {
                    id: GoalId::new("g1"),
                    title: "bob's goal".into(),
                    target_date: date(2024, 4, 1),
                },
            )
            .unwrap();
        let habit = daily_habit(&service, &user, "h1", date(2024, 3, 1));

        let err = service
            .relink_habit(&user, &habit.id, Some(goal.id.clone()))
            .unwrap_err();
        assert_eq!(err, Error::GoalNotFound(goal.id));
    }

    #[test]
    fn expired_goal_appears_completed_in_the_triggering_read() {
        let (service, clock, user) = service_on(date(2024, 3, 1));
        service
            .create_goal(
                &user,
                NewGoal {
                    id: GoalId::new("g1"),
                    title: "ship".into(),
                    target_date: date(2024, 3, 10),
                },
            )
            .unwrap();

        clock.set_day(date(2024, 3, 11));
        let goals = service.goals(&user).unwrap();
        assert_eq!(goals[0].status, Status::Completed);
        assert!(goals[0].is_completed);
    }

    #[test]
    fn unknown_ids_surface_not_found() {
        let (service, _, user) = service_on(date(2024, 3, 1));
        assert!(matches!(
            service.goal(&user, &GoalId::new("nope")),
            Err(Error::GoalNotFound(_))
        ));
        assert!(matches!(
            service.toggle_completion(&user, &HabitId::new("nope")),
            Err(Error::HabitNotFound(_))
        ));
    }
}
