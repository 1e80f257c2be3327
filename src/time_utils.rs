// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Parse an "HH:MM" clock time. Returns `None` for anything else.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Minutes since midnight for an "HH:MM" clock time.
pub fn clock_minutes(raw: &str) -> Option<i64> {
    parse_clock_time(raw).map(|t| i64::from(t.hour() * 60 + t.minute()))
}

/// Whether an optional clock field is either absent or well-formed.
pub fn is_valid_clock_field(raw: Option<&str>) -> bool {
    raw.map_or(true, |t| t.is_empty() || parse_clock_time(t).is_some())
}

/// Today's calendar date in the process's local timezone.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Current local wall-clock time.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Format a deadline for display. The time of day is only shown when an
/// explicit release time was set.
pub fn format_deadline(deadline: NaiveDateTime, has_time: bool) -> String {
    if has_time {
        deadline.format("%Y-%m-%d %H:%M").to_string()
    } else {
        deadline.format("%Y-%m-%d").to_string()
    }
}
