// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary API routes.
//!
//! Mutations answer from memory as soon as the planner has applied them;
//! persistence continues in the background.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityType, Day, Segment, Transport};
use crate::services::planner::PlannerStatus;
use crate::services::schedule::{reservation_reminders, ReservationReminder};
use crate::services::timeline::{
    build_calendar, default_markers, CalendarRow, TimelineMarker, TimelineWindow,
};
use crate::time_utils::{is_valid_clock_field, now_local, today_local};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/days", get(list_days).post(create_day))
        .route(
            "/api/days/{id}",
            get(get_day).put(replace_day).delete(delete_day),
        )
        .route("/api/days/{id}/date", put(set_day_date))
        .route("/api/days/{id}/select", post(select_day))
        .route("/api/days/{id}/activities", post(add_activity))
        .route(
            "/api/days/{id}/activities/{activity_id}",
            put(replace_activity).delete(delete_activity),
        )
        .route(
            "/api/days/{id}/activities/{activity_id}/transport",
            get(get_transport)
                .post(attach_transport)
                .put(replace_transport)
                .delete(remove_transport),
        )
        .route(
            "/api/days/{id}/activities/{activity_id}/transport/segments",
            post(add_segment),
        )
        .route(
            "/api/days/{id}/activities/{activity_id}/transport/segments/{index}",
            put(replace_segment).delete(remove_segment),
        )
        .route("/api/days/{id}/reservations", get(get_reservations))
        .route("/api/calendar", get(get_calendar))
}

// ─── Status ──────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub planner: PlannerStatus,
    pub fallback_reason: Option<String>,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        planner: state.planner.status(),
        fallback_reason: state.fallback_reason.clone(),
    })
}

// ─── Days ────────────────────────────────────────────────────

fn find_day(state: &AppState, day_id: &str) -> Result<Day> {
    state
        .planner
        .day(day_id)
        .ok_or_else(|| AppError::NotFound(format!("Day {day_id}")))
}

/// Reject clock fields that are present but not `HH:MM`.
fn validate_activity(activity: &Activity) -> Result<()> {
    let fields = [
        ("startTime", activity.start_time.as_deref()),
        ("endTime", activity.end_time.as_deref()),
        ("reservationTime", activity.reservation_time.as_deref()),
    ];
    for (name, value) in fields {
        if !is_valid_clock_field(value) {
            return Err(AppError::BadRequest(format!(
                "Invalid '{name}' on activity {}: expected HH:MM",
                activity.id
            )));
        }
    }
    Ok(())
}

async fn list_days(State(state): State<Arc<AppState>>) -> Json<Vec<Day>> {
    Json(state.planner.sorted_days())
}

async fn create_day(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Day>) {
    let (day, _persist) = state.planner.add_day();
    tracing::info!(day_id = %day.id, date = %day.date, "Added day");
    (StatusCode::CREATED, Json(day))
}

async fn get_day(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
) -> Result<Json<Day>> {
    Ok(Json(find_day(&state, &day_id)?))
}

/// Replace a whole day. Unknown ids are inserted.
async fn replace_day(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
    Json(day): Json<Day>,
) -> Result<Json<Day>> {
    if day.id != day_id {
        return Err(AppError::BadRequest(format!(
            "Body id '{}' does not match path id '{day_id}'",
            day.id
        )));
    }
    day.activities.iter().try_for_each(validate_activity)?;

    let _persist = state.planner.update_day(day.clone());
    Ok(Json(day))
}

#[derive(Deserialize)]
struct SetDateRequest {
    date: NaiveDate,
}

async fn set_day_date(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
    Json(body): Json<SetDateRequest>,
) -> Result<Json<Day>> {
    let _persist = state.planner.set_day_date(&day_id, body.date)?;
    Ok(Json(find_day(&state, &day_id)?))
}

async fn delete_day(State(state): State<Arc<AppState>>, Path(day_id): Path<String>) -> StatusCode {
    let _persist = state.planner.delete_day(&day_id);
    tracing::info!(day_id, "Deleted day");
    StatusCode::NO_CONTENT
}

async fn select_day(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
) -> Result<Json<Day>> {
    Ok(Json(state.planner.select_day(&day_id)?))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct AddActivityRequest {
    #[serde(rename = "type")]
    activity_type: ActivityType,
}

async fn add_activity(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
    Json(body): Json<AddActivityRequest>,
) -> Result<(StatusCode, Json<Activity>)> {
    let (activity, _persist) = state.planner.add_activity(&day_id, body.activity_type)?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn replace_activity(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
    Json(activity): Json<Activity>,
) -> Result<Json<Activity>> {
    if activity.id != activity_id {
        return Err(AppError::BadRequest(format!(
            "Body id '{}' does not match path id '{activity_id}'",
            activity.id
        )));
    }
    validate_activity(&activity)?;

    let _persist = state.planner.update_activity(&day_id, activity.clone())?;
    Ok(Json(activity))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let _ = state.planner.delete_activity(&day_id, &activity_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_reservations(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<String>,
) -> Result<Json<Vec<ReservationReminder>>> {
    let day = find_day(&state, &day_id)?;
    Ok(Json(reservation_reminders(&day, now_local())))
}

// ─── Transport ───────────────────────────────────────────────

/// Transport plus the values derived from it for display.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportResponse {
    #[serde(flatten)]
    pub transport: Transport,
    pub duration_hours: u32,
    pub duration_minutes: u32,
    pub line_badges: Vec<String>,
    /// Each leg starts where the previous one ended.
    pub connected: bool,
}

impl From<Transport> for TransportResponse {
    fn from(transport: Transport) -> Self {
        let (duration_hours, duration_minutes) = transport.duration_parts();
        let line_badges = transport
            .line_badges()
            .into_iter()
            .map(str::to_string)
            .collect();
        let connected = transport.has_connected_segments();
        Self {
            transport,
            duration_hours,
            duration_minutes,
            line_badges,
            connected,
        }
    }
}

async fn get_transport(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
) -> Result<Json<TransportResponse>> {
    let day = find_day(&state, &day_id)?;
    let transport = day
        .activity(&activity_id)
        .ok_or_else(|| AppError::NotFound(format!("Activity {activity_id}")))?
        .transport
        .clone()
        .ok_or_else(|| AppError::NotFound(format!("Transport for activity {activity_id}")))?;
    Ok(Json(transport.into()))
}

async fn attach_transport(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<TransportResponse>)> {
    let (transport, _persist) = state.planner.attach_transport(&day_id, &activity_id)?;
    Ok((StatusCode::CREATED, Json(transport.into())))
}

async fn replace_transport(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
    Json(transport): Json<Transport>,
) -> Result<Json<TransportResponse>> {
    let _persist = state
        .planner
        .update_transport(&day_id, &activity_id, transport.clone())?;
    Ok(Json(transport.into()))
}

async fn remove_transport(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let _ = state.planner.remove_transport(&day_id, &activity_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_segment(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Segment>)> {
    let (segment, _persist) = state.planner.add_segment(&day_id, &activity_id)?;
    Ok((StatusCode::CREATED, Json(segment)))
}

async fn replace_segment(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id, index)): Path<(String, String, usize)>,
    Json(segment): Json<Segment>,
) -> Result<Json<Segment>> {
    let _persist = state
        .planner
        .replace_segment(&day_id, &activity_id, index, segment.clone())?;
    Ok(Json(segment))
}

async fn remove_segment(
    State(state): State<Arc<AppState>>,
    Path((day_id, activity_id, index)): Path<(String, String, usize)>,
) -> Result<StatusCode> {
    let _ = state.planner.remove_segment(&day_id, &activity_id, index)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Calendar ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarQuery {
    start_hour: Option<u32>,
    end_hour: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub start_hour: u32,
    pub end_hour: u32,
    pub markers: Vec<TimelineMarker>,
    pub rows: Vec<CalendarRow>,
}

async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>> {
    let defaults = TimelineWindow::default();
    let start_hour = params.start_hour.unwrap_or(defaults.start_hour);
    let end_hour = params.end_hour.unwrap_or(defaults.end_hour);
    let window = TimelineWindow::new(start_hour, end_hour).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid window {start_hour}..{end_hour}: need startHour < endHour <= 24"
        ))
    })?;

    let days = state.planner.sorted_days();
    Ok(Json(CalendarResponse {
        start_hour,
        end_hour,
        markers: default_markers(window),
        rows: build_calendar(&days, today_local(), window),
    }))
}
