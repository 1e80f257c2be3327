// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timeline (Gantt) layout of activities across a display window.
//!
//! All geometry is on a 0..1 scale so callers can render it as percentages.

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{ActivityType, Day};
use crate::time_utils::clock_minutes;

/// Floor on bar width so zero-length or out-of-window activities stay visible.
pub const MIN_VISIBLE_WIDTH: f64 = 0.01;

const DEFAULT_START_HOUR: u32 = 6;
const DEFAULT_END_HOUR: u32 = 24;
const MARKER_STEP_HOURS: u32 = 3;

/// Visible hours `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for TimelineWindow {
    fn default() -> Self {
        Self {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

impl TimelineWindow {
    /// Build a window, rejecting empty or out-of-day ranges.
    pub fn new(start_hour: u32, end_hour: u32) -> Option<Self> {
        (start_hour < end_hour && end_hour <= 24).then_some(Self {
            start_hour,
            end_hour,
        })
    }

    fn start_minutes(&self) -> i64 {
        i64::from(self.start_hour) * 60
    }

    fn total_minutes(&self) -> f64 {
        f64::from((self.end_hour - self.start_hour) * 60)
    }

    /// Grid lines every `step_hours`, starting at the window start.
    pub fn markers(&self, step_hours: u32) -> Vec<TimelineMarker> {
        let step = step_hours.max(1) as usize;
        (self.start_hour..self.end_hour)
            .step_by(step)
            .map(|hour| TimelineMarker {
                hour,
                offset_fraction: f64::from((hour - self.start_hour) * 60) / self.total_minutes(),
            })
            .collect()
    }
}

/// Horizontal placement of one activity bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePosition {
    pub offset_fraction: f64,
    pub width_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMarker {
    pub hour: u32,
    pub offset_fraction: f64,
}

/// Place an activity on the timeline.
///
/// Returns `None` ("not representable") when either time is missing or not
/// an "HH:MM" value.
pub fn compute_timeline_position(
    start_time: Option<&str>,
    end_time: Option<&str>,
    window: TimelineWindow,
) -> Option<TimelinePosition> {
    let start = clock_minutes(start_time?)?;
    let end = clock_minutes(end_time?)?;
    let total = window.total_minutes();

    let offset = (start - window.start_minutes()) as f64 / total;
    let width = (end - start) as f64 / total;

    Some(TimelinePosition {
        offset_fraction: offset.max(0.0),
        width_fraction: width.max(MIN_VISIBLE_WIDTH),
    })
}

/// One bar in a calendar row.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub activity_id: String,
    pub title: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub activity_type: ActivityType,
    pub start_time: String,
    pub end_time: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub position: TimelinePosition,
}

/// One entry in the time-sorted agenda list.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub activity_id: String,
    pub title: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub activity_type: ActivityType,
    pub start_time: Option<String>,
    /// Meal slots are styled apart from sightseeing slots.
    pub is_meal: bool,
    /// Reservation still needs attention (required, and the day is not over).
    pub show_reservation_notice: bool,
}

/// Calendar overview row for one day.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRow {
    pub day_id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub is_past: bool,
    pub is_today: bool,
    pub bars: Vec<TimelineBar>,
    pub agenda: Vec<AgendaItem>,
}

/// Lay out every day, sorted by date.
///
/// Activities without both times are left out of `bars` but still appear in
/// `agenda`.
pub fn build_calendar(days: &[Day], today: NaiveDate, window: TimelineWindow) -> Vec<CalendarRow> {
    let mut sorted: Vec<&Day> = days.iter().collect();
    sorted.sort_by_key(|d| d.date);

    sorted
        .into_iter()
        .map(|day| {
            let is_past = day.is_past(today);

            let bars = day
                .activities
                .iter()
                .filter_map(|a| {
                    let position = compute_timeline_position(
                        a.start_time.as_deref(),
                        a.end_time.as_deref(),
                        window,
                    )?;
                    Some(TimelineBar {
                        activity_id: a.id.clone(),
                        title: a.title.clone(),
                        activity_type: a.activity_type,
                        start_time: a.start_time.clone().unwrap_or_default(),
                        end_time: a.end_time.clone().unwrap_or_default(),
                        position,
                    })
                })
                .collect();

            let agenda = day
                .agenda()
                .into_iter()
                .map(|a| AgendaItem {
                    activity_id: a.id.clone(),
                    title: a.title.clone(),
                    activity_type: a.activity_type,
                    start_time: a.start_time.clone(),
                    is_meal: a.activity_type.is_meal(),
                    show_reservation_notice: a.requires_reservation && !is_past,
                })
                .collect();

            CalendarRow {
                day_id: day.id.clone(),
                date: day.date,
                is_past,
                is_today: day.is_today(today),
                bars,
                agenda,
            }
        })
        .collect()
}

/// Markers for the default grid spacing.
pub fn default_markers(window: TimelineWindow) -> Vec<TimelineMarker> {
    window.markers(MARKER_STEP_HOURS)
}
