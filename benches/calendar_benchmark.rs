use std::hint::black_box;

use chrono::{Days, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use itinerary_planner::models::{ActivityType, Day};
use itinerary_planner::services::timeline::{build_calendar, TimelineWindow};

/// A two-week trip with every slot filled, times staggered through the day.
fn fixture_trip(start: NaiveDate) -> Vec<Day> {
    (0..14u64)
        .map(|offset| {
            let mut day = Day::new(start + Days::new(offset));
            for (slot, activity_type) in ActivityType::ALL.into_iter().enumerate() {
                let id = day.add_activity(activity_type).id.clone();
                let mut activity = day.activity(&id).cloned().expect("just added");
                let hour = 7 + slot as u32 * 3;
                activity.start_time = Some(format!("{hour:02}:15"));
                activity.end_time = Some(format!("{:02}:45", hour + 1));
                activity.requires_reservation = slot % 2 == 0;
                activity.reservation_advance_days = Some(slot as u32 + 1);
                day.replace_activity(activity);
            }
            day
        })
        .collect()
}

fn benchmark_build_calendar(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 10, 1).expect("valid date");
    let days = fixture_trip(start);
    let today = start + Days::new(5);

    let mut group = c.benchmark_group("calendar");

    group.bench_function("two_weeks_default_window", |b| {
        b.iter(|| build_calendar(black_box(&days), today, TimelineWindow::default()))
    });

    let narrow = TimelineWindow::new(9, 18).expect("valid window");
    group.bench_function("two_weeks_narrow_window", |b| {
        b.iter(|| build_calendar(black_box(&days), today, narrow))
    });

    group.finish();
}

criterion_group!(benches, benchmark_build_calendar);
criterion_main!(benches);
