//! Walk a goal with two linked habits through a week of completions and an
//! expired deadline. Run with `RUST_LOG=debug` to watch the aggregator work.

use std::sync::Arc;

use chrono::NaiveDate;

use nawyk_core::{
    FixedClock, GoalId, HabitId, HabitService, MemoryStore, NewGoal, NewHabit, Schedule, UserId,
    WeekdayToken,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"); // a Monday
    let clock = Arc::new(FixedClock::on_day(start));
    let service = HabitService::builder()
        .with_memory_store(Arc::new(MemoryStore::new()))
        .with_clock(clock.clone())
        .build()?;

    let user = UserId::new("demo");
    let goal = service.create_goal(
        &user,
        NewGoal {
            id: GoalId::new("goal-fitness"),
            title: "Get moving in January".into(),
            target_date: NaiveDate::from_ymd_opt(2024, 1, 14).expect("valid date"),
        },
    )?;

    service.create_habit(
        &user,
        NewHabit {
            id: HabitId::new("habit-stretch"),
            title: "Morning stretch".into(),
            schedule: Schedule::daily(start),
            linked_goal_id: Some(goal.id.clone()),
        },
    )?;
    service.create_habit(
        &user,
        NewHabit {
            id: HabitId::new("habit-run"),
            title: "Run".into(),
            schedule: Schedule::weekly(start, [WeekdayToken::Mon, WeekdayToken::Thu]),
            linked_goal_id: Some(goal.id.clone()),
        },
    )?;

    for offset in 0..7 {
        clock.set_day(start + chrono::Duration::days(offset));
        service.toggle_completion(&user, &HabitId::new("habit-stretch"))?;
        if let Err(err) = service.toggle_completion(&user, &HabitId::new("habit-run")) {
            println!("run skipped on day {offset}: {err}");
        }
    }

    let goal = service.goal(&user, &goal.id)?;
    println!("after one week: progress {}%", goal.progress);

    // Jump past the deadline; the next read sweeps the goal to completion.
    clock.set_day(NaiveDate::from_ymd_opt(2024, 1, 20).expect("valid date"));
    let goal = service.goal(&user, &goal.id)?;
    println!(
        "after the deadline: status {:?}, progress {}%",
        goal.status, goal.progress
    );

    for habit in service.habits(&user)? {
        println!(
            "{}: streak {}, longest {}, status {:?}",
            habit.title, habit.streak, habit.longest_streak, habit.status
        );
    }
    Ok(())
}
