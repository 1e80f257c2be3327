// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary data model shared by the backends, the planner and the API.

pub mod activity;
pub mod day;
pub mod transport;

pub use activity::{Activity, ActivityType};
pub use day::Day;
pub use transport::{Segment, Transport, TransportMode};

/// Generate a fresh entity id (random v4 UUID, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Coerce free-form numeric input to a count.
///
/// Reads the leading run of decimal digits (after trimming), so `"12 stops"`
/// gives 12. Anything without leading digits gives 0.
pub fn coerce_count(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Serde helper for user-editable counts: accepts numbers, numeric strings,
/// null, or anything else (which becomes 0).
pub(crate) mod lenient_count {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(coerce_value(&value))
    }

    /// Like [`deserialize`], but null stays `None`.
    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok((!value.is_null()).then(|| coerce_value(&value)))
    }

    fn coerce_value(value: &serde_json::Value) -> u32 {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    u32::try_from(v).unwrap_or(u32::MAX)
                } else if let Some(f) = n.as_f64() {
                    if f.is_finite() && f > 0.0 {
                        f.trunc().min(u32::MAX as f64) as u32
                    } else {
                        0
                    }
                } else {
                    0
                }
            }
            serde_json::Value::String(s) => super::coerce_count(s),
            _ => 0,
        }
    }
}
