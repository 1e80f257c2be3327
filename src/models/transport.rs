// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transport legs used to reach an activity.

use serde::{Deserialize, Serialize};

use super::{lenient_count, new_id};

const DEFAULT_DURATION_MINUTES: u32 = 30;
const DEFAULT_LINE_NAME: &str = "Line 1";
const DEFAULT_LINE_COLOR: &str = "#c23a30";

/// How the traveller gets to an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Subway,
    Car,
    Walk,
}

/// Journey taken to arrive at an activity.
///
/// `segments` is only populated for [`TransportMode::Subway`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transport {
    pub id: String,
    pub mode: TransportMode,
    pub start_location: String,
    pub end_location: String,
    #[serde(default, deserialize_with = "lenient_count::deserialize")]
    pub total_duration_minutes: u32,
    /// Persisted but not shown anywhere.
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// One uninterrupted ride on a single subway line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub line_name: String,
    /// Colour token, usually a hex code.
    pub line_color: String,
    pub start_station: String,
    pub end_station: String,
    #[serde(default, deserialize_with = "lenient_count::deserialize")]
    pub station_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            id: new_id(),
            line_name: DEFAULT_LINE_NAME.to_string(),
            line_color: DEFAULT_LINE_COLOR.to_string(),
            start_station: String::new(),
            end_station: String::new(),
            station_count: 1,
            direction: None,
            status: None,
        }
    }
}

impl Transport {
    /// Default subway route ending at `destination`.
    pub fn new_subway(destination: &str) -> Self {
        Self {
            id: new_id(),
            mode: TransportMode::Subway,
            start_location: "Start".to_string(),
            end_location: destination.to_string(),
            total_duration_minutes: DEFAULT_DURATION_MINUTES,
            total_distance_km: 0.0,
            segments: Vec::new(),
            price: None,
        }
    }

    /// Append a default segment and return it.
    pub fn add_segment(&mut self) -> &Segment {
        self.segments.push(Segment::default());
        &self.segments[self.segments.len() - 1]
    }

    /// Replace the segment at `index`. Out-of-range indexes are ignored.
    pub fn replace_segment(&mut self, index: usize, segment: Segment) -> bool {
        match self.segments.get_mut(index) {
            Some(slot) => {
                *slot = segment;
                true
            }
            None => false,
        }
    }

    /// Remove the segment at `index`. Out-of-range indexes are ignored.
    pub fn remove_segment(&mut self, index: usize) -> Option<Segment> {
        (index < self.segments.len()).then(|| self.segments.remove(index))
    }

    /// Duration split into whole hours and remaining minutes.
    pub fn duration_parts(&self) -> (u32, u32) {
        (
            self.total_duration_minutes / 60,
            self.total_duration_minutes % 60,
        )
    }

    /// Line names of each leg, in ride order.
    pub fn line_badges(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.line_name.as_str()).collect()
    }

    /// Whether each leg starts at the station the previous leg ended at.
    ///
    /// Informational only; nothing rejects a disconnected route.
    pub fn has_connected_segments(&self) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[0].end_station == pair[1].start_station)
    }
}
