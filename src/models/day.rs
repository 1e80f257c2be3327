// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Day plan: one calendar date's ordered list of activities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, Activity, ActivityType};
use crate::time_utils::today_local;

/// Stored day record (also the unit of persistence).
///
/// `id` is the document key in the remote collection and the match key in the
/// local blob. Two days may share a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    /// Calendar date, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    /// Insertion order is display order.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Day {
    /// Empty day on `date` with a fresh id.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: new_id(),
            date,
            activities: Vec::new(),
        }
    }

    /// Empty day dated today (local calendar).
    pub fn today() -> Self {
        Self::new(today_local())
    }

    pub fn activity(&self, activity_id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == activity_id)
    }

    /// Append a blank activity of `activity_type` and return it.
    pub fn add_activity(&mut self, activity_type: ActivityType) -> &Activity {
        self.activities.push(Activity::new(activity_type));
        &self.activities[self.activities.len() - 1]
    }

    /// Replace the activity with the same id, keeping its position.
    pub fn replace_activity(&mut self, activity: Activity) -> bool {
        match self.activities.iter_mut().find(|a| a.id == activity.id) {
            Some(slot) => {
                *slot = activity;
                true
            }
            None => false,
        }
    }

    /// Remove an activity (and its transport). Absent ids are a no-op.
    pub fn remove_activity(&mut self, activity_id: &str) -> Option<Activity> {
        let index = self.activities.iter().position(|a| a.id == activity_id)?;
        Some(self.activities.remove(index))
    }

    /// Activities in one slot, in insertion order.
    pub fn activities_of_type(&self, activity_type: ActivityType) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.activity_type == activity_type)
            .collect()
    }

    /// Activities sorted by start time; untimed ones first.
    pub fn agenda(&self) -> Vec<&Activity> {
        let mut sorted: Vec<&Activity> = self.activities.iter().collect();
        sorted.sort_by(|a, b| {
            a.start_time
                .as_deref()
                .unwrap_or("")
                .cmp(b.start_time.as_deref().unwrap_or(""))
        });
        sorted
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.date < today
    }

    pub fn is_today(&self, today: NaiveDate) -> bool {
        self.date == today
    }
}
