// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod planner;
pub mod schedule;
pub mod timeline;

pub use planner::{Planner, PlannerStatus, SyncFailure};
pub use schedule::{compute_reservation_deadline, reservation_reminders, ReservationReminder};
pub use timeline::{build_calendar, compute_timeline_position, CalendarRow, TimelineWindow};
