//! Goal progress aggregation.
//!
//! A goal's `progress` is a cached percentage derived from its linked
//! habits: how many completions the schedules implied up to the goal's
//! target date versus how many actually happened. Callers re-run the
//! aggregator after every mutation that can change those inputs.

use tracing::{debug, warn};

use crate::model::GoalId;
use crate::store::{GoalStore, HabitStore, StoreError};

/// Recompute and persist a goal's cached progress.
///
/// A missing goal is a no-op rather than an error: the goal may have been
/// deleted between the triggering mutation and this recompute, and there is
/// nothing left to update. Idempotent for unchanged inputs.
pub fn recompute_goal_progress(
    goals: &dyn GoalStore,
    habits: &dyn HabitStore,
    goal_id: &GoalId,
) -> Result<(), StoreError> {
    let Some(mut goal) = goals.load(goal_id)? else {
        return Ok(());
    };

    let mut total_expected: u64 = 0;
    let mut total_actual: u64 = 0;

    for habit_id in &goal.linked_habits {
        let Some(habit) = habits.load(habit_id)? else {
            debug!(%goal_id, %habit_id, "linked habit missing, skipping");
            continue;
        };

        let expected = habit.schedule.expected_completions(goal.target_date);
        // Only completions inside [habit start, goal target] earn credit,
        // and weekly habits only on their configured weekdays. Completions
        // accumulated before linking or after the deadline would otherwise
        // inflate the ratio.
        let actual = habit
            .completed_dates
            .range(habit.schedule.start_date..=goal.target_date)
            .filter(|day| habit.schedule.counts_completion(**day))
            .count() as u64;

        total_expected += expected as u64;
        total_actual += actual;
        debug!(
            habit = %habit.id,
            title = %habit.title,
            expected,
            actual,
            "aggregated habit completions"
        );
    }

    let progress = percentage(total_actual, total_expected);
    debug!(
        %goal_id,
        total_expected,
        total_actual,
        progress,
        "recomputed goal progress"
    );
    goal.progress = progress;
    goals.upsert(goal)
}

/// Best-effort recompute for cascades: a failure leaves the cached progress
/// stale until the next recompute and must not fail the mutation that
/// triggered it, so it is logged and swallowed here.
pub(crate) fn refresh_goal_progress(
    goals: &dyn GoalStore,
    habits: &dyn HabitStore,
    goal_id: &GoalId,
) {
    if let Err(err) = recompute_goal_progress(goals, habits, goal_id) {
        warn!(%goal_id, %err, "failed to refresh goal progress");
    }
}

/// Rounded percentage, clamped to 100. Zero expected yields zero progress.
fn percentage(actual: u64, expected: u64) -> u8 {
    if expected == 0 {
        return 0;
    }
    let ratio = (100.0 * actual as f64 / expected as f64).round();
    ratio.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nawyk_domain::date::WeekdayToken;
    use nawyk_domain::schedule::Schedule;

    use crate::model::{Goal, Habit, HabitId, UserId};
    use crate::store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(target: NaiveDate) -> (MemoryStore, GoalId) {
        let store = MemoryStore::new();
        let goal = Goal::new(GoalId::new("g1"), UserId::new("alice"), "goal", target);
        GoalStore::upsert(&store, goal).unwrap();
        (store, GoalId::new("g1"))
    }

    fn link(store: &MemoryStore, goal_id: &GoalId, mut habit: Habit) {
        habit.linked_goal_id = Some(goal_id.clone());
        let mut goal = GoalStore::load(store, goal_id).unwrap().unwrap();
        goal.linked_habits.insert(habit.id.clone());
        GoalStore::upsert(store, goal).unwrap();
        HabitStore::upsert(store, habit).unwrap();
    }

    #[test]
    fn missing_goal_is_a_no_op() {
        let store = MemoryStore::new();
        recompute_goal_progress(&store, &store, &GoalId::new("nope")).unwrap();
    }

    #[test]
    fn goal_without_habits_has_zero_progress() {
        let (store, goal_id) = fixture(date(2024, 1, 10));
        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        assert_eq!(GoalStore::load(&store, &goal_id).unwrap().unwrap().progress, 0);
    }

    #[test]
    fn daily_habit_half_done() {
        let (store, goal_id) = fixture(date(2024, 1, 10));
        let mut habit = Habit::new(
            HabitId::new("h1"),
            UserId::new("alice"),
            "read",
            Schedule::daily(date(2024, 1, 1)),
        );
        // 5 of the 10 expected days.
        habit.completed_dates = (1..=5).map(|d| date(2024, 1, d)).collect();
        link(&store, &goal_id, habit);

        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        assert_eq!(GoalStore::load(&store, &goal_id).unwrap().unwrap().progress, 50);
    }

    #[test]
    fn recompute_is_idempotent() {
        let (store, goal_id) = fixture(date(2024, 1, 10));
        let mut habit = Habit::new(
            HabitId::new("h1"),
            UserId::new("alice"),
            "read",
            Schedule::daily(date(2024, 1, 1)),
        );
        habit.completed_dates = (1..=3).map(|d| date(2024, 1, d)).collect();
        link(&store, &goal_id, habit);

        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        let first = GoalStore::load(&store, &goal_id).unwrap().unwrap().progress;
        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        let second = GoalStore::load(&store, &goal_id).unwrap().unwrap().progress;
        assert_eq!(first, second);
        assert_eq!(first, 30);
    }

    #[test]
    fn over_completion_clamps_at_one_hundred() {
        let (store, goal_id) = fixture(date(2024, 1, 20));
        let mut habit = Habit::new(
            HabitId::new("h1"),
            UserId::new("alice"),
            "budget review",
            Schedule::monthly(date(2024, 1, 15)),
        );
        // One expected occurrence (Jan 15) but three in-window completions:
        // 300% before the clamp.
        habit.completed_dates = [date(2024, 1, 15), date(2024, 1, 16), date(2024, 1, 17)]
            .into_iter()
            .collect();
        link(&store, &goal_id, habit);

        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        assert_eq!(GoalStore::load(&store, &goal_id).unwrap().unwrap().progress, 100);
    }

    #[test]
    fn out_of_window_and_off_schedule_completions_earn_nothing() {
        let (store, goal_id) = fixture(date(2024, 1, 14));
        let mut habit = Habit::new(
            HabitId::new("h1"),
            UserId::new("alice"),
            "run",
            Schedule::weekly(date(2024, 1, 1), [WeekdayToken::Mon]),
        );
        habit.completed_dates = [
            date(2023, 12, 25), // before the habit started
            date(2024, 1, 2),   // a Tuesday, off schedule
            date(2024, 1, 8),   // Monday, counts
            date(2024, 1, 22),  // after the goal target
        ]
        .into_iter()
        .collect();
        link(&store, &goal_id, habit);

        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        // Expected: Mondays Jan 1 and Jan 8 → 2; actual: 1.
        assert_eq!(GoalStore::load(&store, &goal_id).unwrap().unwrap().progress, 50);
    }

    #[test]
    fn progress_sums_across_habits() {
        let (store, goal_id) = fixture(date(2024, 1, 4));
        let mut done = Habit::new(
            HabitId::new("h1"),
            UserId::new("alice"),
            "water",
            Schedule::daily(date(2024, 1, 1)),
        );
        done.completed_dates = (1..=4).map(|d| date(2024, 1, d)).collect();
        link(&store, &goal_id, done);
        let untouched = Habit::new(
            HabitId::new("h2"),
            UserId::new("alice"),
            "journal",
            Schedule::daily(date(2024, 1, 1)),
        );
        link(&store, &goal_id, untouched);

        recompute_goal_progress(&store, &store, &goal_id).unwrap();
        // 4 of 8 total expected completions.
        assert_eq!(GoalStore::load(&store, &goal_id).unwrap().unwrap().progress, 50);
    }
}
