// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reservation deadline evaluation.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Day;
use crate::time_utils::{format_deadline, parse_clock_time};

/// Compute the moment a reservation must be made by.
///
/// Subtracts `advance_days` calendar days from `trip_date` and sets the time
/// of day to `reservation_time` (replacing, not adding). Without a usable
/// time the deadline is midnight. Returns `None` when no reservation is
/// required or no advance period is known.
pub fn compute_reservation_deadline(
    trip_date: NaiveDate,
    requires_reservation: bool,
    advance_days: Option<u32>,
    reservation_time: Option<&str>,
) -> Option<NaiveDateTime> {
    if !requires_reservation {
        return None;
    }
    let advance_days = advance_days?;
    let date = trip_date.checked_sub_days(Days::new(u64::from(advance_days)))?;

    let time = match reservation_time {
        Some(raw) if !raw.is_empty() => parse_clock_time(raw).unwrap_or_else(|| {
            tracing::debug!(reservation_time = raw, "Ignoring malformed reservation time");
            NaiveTime::MIN
        }),
        _ => NaiveTime::MIN,
    };

    Some(date.and_time(time))
}

/// Strictly-after comparison; a missing deadline is never past.
pub fn is_deadline_past(deadline: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    deadline.is_some_and(|d| now > d)
}

/// Reservation status of a single activity.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReminder {
    pub activity_id: String,
    pub title: String,
    pub deadline: Option<NaiveDateTime>,
    /// Deadline rendered for display, with the time only when one was set.
    pub deadline_label: Option<String>,
    pub is_past: bool,
}

/// Reminders for every activity in `day` that requires a reservation.
pub fn reservation_reminders(day: &Day, now: NaiveDateTime) -> Vec<ReservationReminder> {
    day.activities
        .iter()
        .filter(|a| a.requires_reservation)
        .map(|a| {
            let deadline = a.reservation_deadline(day.date);
            let has_time = a
                .reservation_time
                .as_deref()
                .and_then(parse_clock_time)
                .is_some();
            ReservationReminder {
                activity_id: a.id.clone(),
                title: a.title.clone(),
                deadline,
                deadline_label: deadline.map(|d| format_deadline(d, has_time)),
                is_past: is_deadline_past(deadline, now),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, ActivityType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_deadline_with_release_time() {
        let deadline =
            compute_reservation_deadline(date(2024, 3, 10), true, Some(3), Some("09:00"));
        assert_eq!(deadline, Some(at(2024, 3, 7, 9, 0)));
    }

    #[test]
    fn test_deadline_month_rollover() {
        let deadline = compute_reservation_deadline(date(2024, 3, 1), true, Some(5), None);
        assert_eq!(deadline, Some(at(2024, 2, 25, 0, 0)));
    }

    #[test]
    fn test_deadline_year_rollover() {
        let deadline = compute_reservation_deadline(date(2025, 1, 2), true, Some(3), Some("20:30"));
        assert_eq!(deadline, Some(at(2024, 12, 30, 20, 30)));
    }

    #[test]
    fn test_deadline_absent_cases() {
        assert_eq!(
            compute_reservation_deadline(date(2024, 3, 10), false, Some(3), Some("09:00")),
            None
        );
        assert_eq!(
            compute_reservation_deadline(date(2024, 3, 10), true, None, Some("09:00")),
            None
        );
    }

    #[test]
    fn test_deadline_zero_days_is_trip_date() {
        let deadline = compute_reservation_deadline(date(2024, 3, 10), true, Some(0), Some("08:00"));
        assert_eq!(deadline, Some(at(2024, 3, 10, 8, 0)));
    }

    #[test]
    fn test_malformed_time_falls_back_to_midnight() {
        let deadline = compute_reservation_deadline(date(2024, 3, 10), true, Some(1), Some("soon"));
        assert_eq!(deadline, Some(at(2024, 3, 9, 0, 0)));
    }

    #[test]
    fn test_is_deadline_past_is_strict() {
        let deadline = at(2024, 3, 7, 9, 0);
        assert!(!is_deadline_past(Some(deadline), deadline));
        assert!(is_deadline_past(Some(deadline), at(2024, 3, 7, 9, 1)));
        assert!(!is_deadline_past(Some(deadline), at(2024, 3, 6, 23, 59)));
        assert!(!is_deadline_past(None, at(2030, 1, 1, 0, 0)));
    }

    #[test]
    fn test_reservation_reminders() {
        let mut day = Day::new(date(2024, 3, 10));
        let mut palace = Activity::new(ActivityType::Morning);
        palace.title = "Palace Museum".to_string();
        palace.requires_reservation = true;
        palace.reservation_advance_days = Some(7);
        palace.reservation_time = Some("20:00".to_string());
        day.activities.push(palace);

        let mut noodles = Activity::new(ActivityType::Lunch);
        noodles.requires_reservation = true;
        noodles.reservation_advance_days = Some(1);
        day.activities.push(noodles);

        day.activities.push(Activity::new(ActivityType::Dinner));

        let reminders = reservation_reminders(&day, at(2024, 3, 5, 12, 0));
        assert_eq!(reminders.len(), 2);
        assert_eq!(reminders[0].deadline_label.as_deref(), Some("2024-03-03 20:00"));
        assert!(reminders[0].is_past);
        assert_eq!(reminders[1].deadline_label.as_deref(), Some("2024-03-09"));
        assert!(!reminders[1].is_past);
    }
}
