// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity model: one scheduled event within a day.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{lenient_count, new_id, Transport};
use crate::services::schedule::compute_reservation_deadline;

/// Slot of the day an activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Breakfast,
    Morning,
    Lunch,
    Afternoon,
    Dinner,
}

impl ActivityType {
    /// All slots in display order.
    pub const ALL: [ActivityType; 5] = [
        ActivityType::Breakfast,
        ActivityType::Morning,
        ActivityType::Lunch,
        ActivityType::Afternoon,
        ActivityType::Dinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Breakfast => "breakfast",
            ActivityType::Morning => "morning",
            ActivityType::Lunch => "lunch",
            ActivityType::Afternoon => "afternoon",
            ActivityType::Dinner => "dinner",
        }
    }

    /// Whether this slot is a meal.
    pub fn is_meal(&self) -> bool {
        matches!(
            self,
            ActivityType::Breakfast | ActivityType::Lunch | ActivityType::Dinner
        )
    }
}

/// Stored activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub requires_reservation: bool,
    /// How many days before the trip date booking opens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_count::deserialize_option"
    )]
    pub reservation_advance_days: Option<u32>,
    /// "HH:MM" at which tickets are released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_time: Option<String>,
    /// Transport used to arrive at this activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
}

impl Activity {
    /// Blank activity of the given type.
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            id: new_id(),
            activity_type,
            title: String::new(),
            location: None,
            start_time: None,
            end_time: None,
            requires_reservation: false,
            reservation_advance_days: None,
            reservation_time: None,
            transport: None,
        }
    }

    /// Attach a default subway route ending at this activity's location.
    pub fn attach_default_transport(&mut self) -> &mut Transport {
        let destination = self
            .location
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or("Destination");
        self.transport.insert(Transport::new_subway(destination))
    }

    pub fn clear_transport(&mut self) -> Option<Transport> {
        self.transport.take()
    }

    /// Moment before which the reservation must be made, if any.
    pub fn reservation_deadline(&self, trip_date: NaiveDate) -> Option<NaiveDateTime> {
        compute_reservation_deadline(
            trip_date,
            self.requires_reservation,
            self.reservation_advance_days,
            self.reservation_time.as_deref(),
        )
    }
}
