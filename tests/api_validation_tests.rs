// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app, json_request};

#[tokio::test]
async fn test_replace_day_id_mismatch() {
    let (app, state) = create_test_app().await;
    let day_id = state.planner.days()[0].id.clone();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/days/{day_id}"),
            Some(json!({ "id": "someone-else", "date": "2024-10-01", "activities": [] })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
    assert_eq!(state.planner.day(&day_id).unwrap().activities.len(), 0);
}

#[tokio::test]
async fn test_replace_day_rejects_bad_clock_time() {
    let (app, state) = create_test_app().await;
    let original = state.planner.days()[0].clone();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/days/{}", original.id),
            Some(json!({
                "id": original.id,
                "date": "2024-10-01",
                "activities": [{ "id": "a1", "type": "dinner", "startTime": "7pm" }]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("startTime"));
    assert_eq!(state.planner.day(&original.id), Some(original));
}

#[tokio::test]
async fn test_empty_clock_fields_are_accepted() {
    let (app, state) = create_test_app().await;
    let day_id = state.planner.days()[0].id.clone();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/days/{day_id}"),
            Some(json!({
                "id": day_id,
                "date": "2024-10-01",
                "activities": [{ "id": "a1", "type": "dinner", "startTime": "", "endTime": "" }]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_activity_type() {
    let (app, state) = create_test_app().await;
    let day_id = state.planner.days()[0].id.clone();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/days/{day_id}/activities"),
            Some(json!({ "type": "brunch" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_calendar_window_validation() {
    let (app, _) = create_test_app().await;

    for uri in [
        "/api/calendar?startHour=12&endHour=12",
        "/api/calendar?startHour=18&endHour=9",
        "/api/calendar?startHour=0&endHour=25",
    ] {
        let response = app
            .clone()
            .oneshot(json_request("GET", uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }

    let response = app
        .oneshot(json_request("GET", "/api/calendar?startHour=8&endHour=20", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["markers"][0]["hour"], 8);
}

#[tokio::test]
async fn test_select_unknown_day() {
    let (app, _) = create_test_app().await;
    let response = app
        .oneshot(json_request("POST", "/api/days/nope/select", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
