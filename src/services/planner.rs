// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory itinerary state with optimistic persistence.
//!
//! Every mutation lands in memory before the backend is asked to persist it.
//! Persistence runs on a spawned task; a failure is logged, recorded and
//! broadcast, but never rolled back. Authoritative state arrives through the
//! backend subscription and replaces the in-memory collection wholesale.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::db::{BackendKind, DayBackend, ErrorCallback, SnapshotCallback, Subscription};
use crate::error::AppError;
use crate::models::{Activity, ActivityType, Day, Segment, Transport};

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// A persistence call that did not complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub operation: String,
    pub day_id: Option<String>,
    pub message: String,
}

/// Point-in-time view of the planner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerStatus {
    pub backend: BackendKind,
    pub loaded: bool,
    pub day_count: usize,
    pub selected_day_id: Option<String>,
    pub last_failure: Option<SyncFailure>,
}

#[derive(Default)]
struct PlannerState {
    days: Vec<Day>,
    selected_day_id: Option<String>,
    loaded: bool,
    last_failure: Option<SyncFailure>,
}

impl PlannerState {
    fn apply_snapshot(&mut self, days: Vec<Day>) {
        self.days = days;
        self.loaded = true;
        self.ensure_selection();
    }

    /// Point the selection at an existing day: keep it if it still exists,
    /// otherwise fall back to the first day (or nothing).
    fn ensure_selection(&mut self) {
        let still_present = self
            .selected_day_id
            .as_deref()
            .is_some_and(|id| self.days.iter().any(|d| d.id == id));
        if !still_present {
            self.selected_day_id = self.days.first().map(|d| d.id.clone());
        }
    }

    fn upsert(&mut self, day: Day) {
        match self.days.iter_mut().find(|d| d.id == day.id) {
            Some(existing) => *existing = day,
            None => self.days.push(day),
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    subscription: Option<Subscription>,
    refresh: Option<JoinHandle<()>>,
}

/// Shared handle: clones observe and mutate the same state.
pub struct Planner<B: DayBackend> {
    backend: Arc<B>,
    state: Arc<Mutex<PlannerState>>,
    failures: broadcast::Sender<SyncFailure>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl<B: DayBackend> Clone for Planner<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            state: self.state.clone(),
            failures: self.failures.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Log, record and broadcast a failed persistence call.
fn record_failure(
    state: &Mutex<PlannerState>,
    failures: &broadcast::Sender<SyncFailure>,
    operation: &str,
    day_id: Option<String>,
    error: AppError,
) {
    tracing::error!(operation, day_id = ?day_id, error = %error, "Persistence failed");
    let failure = SyncFailure {
        operation: operation.to_string(),
        day_id,
        message: error.to_string(),
    };
    lock(state).last_failure = Some(failure.clone());
    // No receivers is fine.
    let _ = failures.send(failure);
}

impl<B: DayBackend> Planner<B> {
    pub fn new(backend: B) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            backend: Arc::new(backend),
            state: Arc::new(Mutex::new(PlannerState::default())),
            failures,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        }
    }

    fn snapshot_callback(&self) -> SnapshotCallback {
        let state = self.state.clone();
        Arc::new(move |days: Vec<Day>| {
            tracing::debug!(count = days.len(), "Received itinerary snapshot");
            lock(&state).apply_snapshot(days);
        })
    }

    fn error_callback(&self) -> ErrorCallback {
        let state = self.state.clone();
        let failures = self.failures.clone();
        Arc::new(move |error: AppError| {
            record_failure(&state, &failures, "subscribe", None, error);
        })
    }

    /// Subscribe to the backend. Calling `start` on a running planner
    /// replaces the previous subscription.
    pub async fn start(&self) {
        self.stop();

        let on_change = self.snapshot_callback();
        let on_error = self.error_callback();
        let subscription = self
            .backend
            .subscribe(on_change.clone(), on_error.clone())
            .await;

        let refresh = self.backend.change_signal().map(|mut signal| {
            let backend = self.backend.clone();
            tokio::spawn(async move {
                loop {
                    match signal.recv().await {
                        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            tracing::debug!("Store changed, re-reading itinerary");
                            backend
                                .subscribe(on_change.clone(), on_error.clone())
                                .await
                                .unsubscribe();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        });

        let mut lifecycle = lock(&self.lifecycle);
        lifecycle.subscription = Some(subscription);
        lifecycle.refresh = refresh;
        tracing::info!(backend = ?self.backend.kind(), "Planner started");
    }

    /// Stop receiving updates. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut lifecycle = lock(&self.lifecycle);
        if let Some(subscription) = lifecycle.subscription.take() {
            subscription.unsubscribe();
            tracing::info!("Planner stopped");
        }
        if let Some(refresh) = lifecycle.refresh.take() {
            refresh.abort();
        }
    }

    /// Receiver for persistence failures from this point on.
    pub fn failures(&self) -> broadcast::Receiver<SyncFailure> {
        self.failures.subscribe()
    }

    pub fn days(&self) -> Vec<Day> {
        lock(&self.state).days.clone()
    }

    pub fn sorted_days(&self) -> Vec<Day> {
        let mut days = self.days();
        days.sort_by_key(|d| d.date);
        days
    }

    pub fn day(&self, day_id: &str) -> Option<Day> {
        lock(&self.state).days.iter().find(|d| d.id == day_id).cloned()
    }

    pub fn selected_day(&self) -> Option<Day> {
        let state = lock(&self.state);
        let id = state.selected_day_id.as_deref()?;
        state.days.iter().find(|d| d.id == id).cloned()
    }

    pub fn select_day(&self, day_id: &str) -> Result<Day, AppError> {
        let mut state = lock(&self.state);
        let day = state
            .days
            .iter()
            .find(|d| d.id == day_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Day {day_id}")))?;
        state.selected_day_id = Some(day.id.clone());
        Ok(day)
    }

    pub fn status(&self) -> PlannerStatus {
        let state = lock(&self.state);
        PlannerStatus {
            backend: self.backend.kind(),
            loaded: state.loaded,
            day_count: state.days.len(),
            selected_day_id: state.selected_day_id.clone(),
            last_failure: state.last_failure.clone(),
        }
    }

    /// Replace (or append) `day` in memory, then persist it in the background.
    pub fn update_day(&self, day: Day) -> JoinHandle<()> {
        lock(&self.state).upsert(day.clone());

        let backend = self.backend.clone();
        let state = self.state.clone();
        let failures = self.failures.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.save(&day).await {
                record_failure(&state, &failures, "save", Some(day.id), e);
            }
        })
    }

    /// Remove a day from memory, moving the selection off it, then delete it
    /// in the background.
    pub fn delete_day(&self, day_id: &str) -> JoinHandle<()> {
        {
            let mut state = lock(&self.state);
            state.days.retain(|d| d.id != day_id);
            state.ensure_selection();
        }

        let backend = self.backend.clone();
        let state = self.state.clone();
        let failures = self.failures.clone();
        let day_id = day_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = backend.delete(&day_id).await {
                record_failure(&state, &failures, "delete", Some(day_id), e);
            }
        })
    }

    /// Add an empty day dated today and select it.
    pub fn add_day(&self) -> (Day, JoinHandle<()>) {
        let day = Day::today();
        let handle = self.update_day(day.clone());
        lock(&self.state).selected_day_id = Some(day.id.clone());
        (day, handle)
    }

    fn edit_day<T>(
        &self,
        day_id: &str,
        edit: impl FnOnce(&mut Day) -> Result<T, AppError>,
    ) -> Result<(T, JoinHandle<()>), AppError> {
        let mut day = self
            .day(day_id)
            .ok_or_else(|| AppError::NotFound(format!("Day {day_id}")))?;
        let value = edit(&mut day)?;
        Ok((value, self.update_day(day)))
    }

    pub fn add_activity(
        &self,
        day_id: &str,
        activity_type: ActivityType,
    ) -> Result<(Activity, JoinHandle<()>), AppError> {
        let added = self.edit_day(day_id, |day| Ok(day.add_activity(activity_type).clone()))?;
        tracing::debug!(day_id, activity_type = activity_type.as_str(), "Added activity");
        Ok(added)
    }

    pub fn update_activity(
        &self,
        day_id: &str,
        activity: Activity,
    ) -> Result<JoinHandle<()>, AppError> {
        let (_, handle) = self.edit_day(day_id, |day| {
            let activity_id = activity.id.clone();
            if day.replace_activity(activity) {
                Ok(())
            } else {
                Err(AppError::NotFound(format!("Activity {activity_id}")))
            }
        })?;
        Ok(handle)
    }

    pub fn delete_activity(
        &self,
        day_id: &str,
        activity_id: &str,
    ) -> Result<(Activity, JoinHandle<()>), AppError> {
        self.edit_day(day_id, |day| {
            day.remove_activity(activity_id)
                .ok_or_else(|| AppError::NotFound(format!("Activity {activity_id}")))
        })
    }

    pub fn set_day_date(&self, day_id: &str, date: NaiveDate) -> Result<JoinHandle<()>, AppError> {
        let (_, handle) = self.edit_day(day_id, |day| {
            day.date = date;
            Ok(())
        })?;
        Ok(handle)
    }

    fn edit_activity<T>(
        &self,
        day_id: &str,
        activity_id: &str,
        edit: impl FnOnce(&mut Activity) -> Result<T, AppError>,
    ) -> Result<(T, JoinHandle<()>), AppError> {
        self.edit_day(day_id, |day| {
            let activity = day
                .activities
                .iter_mut()
                .find(|a| a.id == activity_id)
                .ok_or_else(|| AppError::NotFound(format!("Activity {activity_id}")))?;
            edit(activity)
        })
    }

    fn edit_transport<T>(
        &self,
        day_id: &str,
        activity_id: &str,
        edit: impl FnOnce(&mut Transport) -> Result<T, AppError>,
    ) -> Result<(T, JoinHandle<()>), AppError> {
        self.edit_activity(day_id, activity_id, |activity| {
            let transport = activity.transport.as_mut().ok_or_else(|| {
                AppError::NotFound(format!("Transport for activity {activity_id}"))
            })?;
            edit(transport)
        })
    }

    /// Give the activity a default subway route, replacing any existing one.
    pub fn attach_transport(
        &self,
        day_id: &str,
        activity_id: &str,
    ) -> Result<(Transport, JoinHandle<()>), AppError> {
        self.edit_activity(day_id, activity_id, |activity| {
            Ok(activity.attach_default_transport().clone())
        })
    }

    pub fn update_transport(
        &self,
        day_id: &str,
        activity_id: &str,
        transport: Transport,
    ) -> Result<JoinHandle<()>, AppError> {
        let (_, handle) = self.edit_transport(day_id, activity_id, |existing| {
            *existing = transport;
            Ok(())
        })?;
        Ok(handle)
    }

    pub fn remove_transport(
        &self,
        day_id: &str,
        activity_id: &str,
    ) -> Result<(Transport, JoinHandle<()>), AppError> {
        self.edit_activity(day_id, activity_id, |activity| {
            activity.clear_transport().ok_or_else(|| {
                AppError::NotFound(format!("Transport for activity {activity_id}"))
            })
        })
    }

    pub fn add_segment(
        &self,
        day_id: &str,
        activity_id: &str,
    ) -> Result<(Segment, JoinHandle<()>), AppError> {
        self.edit_transport(day_id, activity_id, |transport| {
            Ok(transport.add_segment().clone())
        })
    }

    pub fn replace_segment(
        &self,
        day_id: &str,
        activity_id: &str,
        index: usize,
        segment: Segment,
    ) -> Result<JoinHandle<()>, AppError> {
        let (_, handle) = self.edit_transport(day_id, activity_id, |transport| {
            if transport.replace_segment(index, segment) {
                Ok(())
            } else {
                Err(AppError::NotFound(format!("Segment {index}")))
            }
        })?;
        Ok(handle)
    }

    pub fn remove_segment(
        &self,
        day_id: &str,
        activity_id: &str,
        index: usize,
    ) -> Result<(Segment, JoinHandle<()>), AppError> {
        self.edit_transport(day_id, activity_id, |transport| {
            transport
                .remove_segment(index)
                .ok_or_else(|| AppError::NotFound(format!("Segment {index}")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Backend whose writes block until a permit is released.
    struct GatedBackend {
        release: Arc<Semaphore>,
        saves: Arc<AtomicUsize>,
        fail: bool,
        initial: Vec<Day>,
    }

    impl Default for GatedBackend {
        fn default() -> Self {
            Self {
                release: Arc::new(Semaphore::new(0)),
                saves: Arc::new(AtomicUsize::new(0)),
                fail: false,
                initial: Vec::new(),
            }
        }
    }

    impl GatedBackend {
        async fn wait_for_release(&self) {
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
    }

    impl DayBackend for GatedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        async fn subscribe(&self, on_change: SnapshotCallback, _on_error: ErrorCallback) -> Subscription {
            on_change(self.initial.clone());
            Subscription::detached()
        }

        async fn save(&self, _day: &Day) -> Result<(), AppError> {
            self.wait_for_release().await;
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Database("write rejected".to_string()))
            } else {
                Ok(())
            }
        }

        async fn delete(&self, _day_id: &str) -> Result<(), AppError> {
            self.wait_for_release().await;
            Ok(())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_memory_updates_before_save_completes() {
        let backend = GatedBackend::default();
        let release = backend.release.clone();
        let saves = backend.saves.clone();
        let planner = Planner::new(backend);

        let day = Day::new(date(1));
        let handle = planner.update_day(day.clone());

        assert_eq!(planner.day(&day.id), Some(day));
        assert_eq!(saves.load(Ordering::SeqCst), 0);

        release.add_permits(1);
        handle.await.unwrap();
        assert_eq!(saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_and_reports() {
        let backend = GatedBackend {
            fail: true,
            ..Default::default()
        };
        let release = backend.release.clone();
        let planner = Planner::new(backend);
        let mut failures = planner.failures();

        let day = Day::new(date(2));
        let handle = planner.update_day(day.clone());
        release.add_permits(1);
        handle.await.unwrap();

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.operation, "save");
        assert_eq!(failure.day_id.as_deref(), Some(day.id.as_str()));
        assert!(planner.day(&day.id).is_some());
        assert_eq!(planner.status().last_failure, Some(failure));
    }

    #[tokio::test]
    async fn test_start_selects_first_day() {
        let first = Day::new(date(3));
        let second = Day::new(date(4));
        let planner = Planner::new(GatedBackend {
            initial: vec![first.clone(), second],
            ..Default::default()
        });

        planner.start().await;
        let status = planner.status();
        assert!(status.loaded);
        assert_eq!(status.day_count, 2);
        assert_eq!(status.selected_day_id, Some(first.id));
        planner.stop();
        planner.stop();
    }

    #[tokio::test]
    async fn test_delete_moves_selection() {
        let first = Day::new(date(5));
        let second = Day::new(date(6));
        let backend = GatedBackend {
            initial: vec![first.clone(), second.clone()],
            ..Default::default()
        };
        let release = backend.release.clone();
        let planner = Planner::new(backend);
        planner.start().await;

        let handle = planner.delete_day(&first.id);
        assert_eq!(planner.selected_day().map(|d| d.id), Some(second.id.clone()));

        let last = planner.delete_day(&second.id);
        assert!(planner.selected_day().is_none());
        assert!(planner.days().is_empty());

        release.add_permits(2);
        handle.await.unwrap();
        last.await.unwrap();
    }

    #[tokio::test]
    async fn test_add_day_selects_new_day() {
        let backend = GatedBackend::default();
        let release = backend.release.clone();
        let planner = Planner::new(backend);

        let (day, handle) = planner.add_day();
        assert!(day.activities.is_empty());
        assert_eq!(planner.selected_day(), Some(day));

        release.add_permits(1);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_activity_edits_on_unknown_ids() {
        let planner = Planner::new(GatedBackend::default());
        assert!(matches!(
            planner.add_activity("missing", ActivityType::Lunch),
            Err(AppError::NotFound(_))
        ));

        let day = Day::new(date(7));
        let _ = planner.update_day(day.clone());
        assert!(matches!(
            planner.delete_activity(&day.id, "missing"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            planner.update_activity(&day.id, Activity::new(ActivityType::Dinner)),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(planner.select_day("missing"), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sorted_days_orders_by_date() {
        let planner = Planner::new(GatedBackend::default());
        let late = Day::new(date(20));
        let early = Day::new(date(10));
        let _ = planner.update_day(late.clone());
        let _ = planner.update_day(early.clone());

        let sorted: Vec<_> = planner.sorted_days().into_iter().map(|d| d.id).collect();
        assert_eq!(sorted, vec![early.id, late.id]);
    }

    #[test]
    fn test_snapshot_without_selected_day_reselects() {
        let first = Day::new(date(8));
        let second = Day::new(date(9));
        let mut state = PlannerState::default();
        state.apply_snapshot(vec![first.clone(), second.clone()]);
        state.selected_day_id = Some(second.id.clone());

        state.apply_snapshot(vec![first.clone(), second.clone()]);
        assert_eq!(state.selected_day_id.as_deref(), Some(second.id.as_str()));

        state.apply_snapshot(vec![first.clone()]);
        assert_eq!(state.selected_day_id.as_deref(), Some(first.id.as_str()));

        state.apply_snapshot(Vec::new());
        assert!(state.selected_day_id.is_none());
    }

    #[tokio::test]
    async fn test_transport_edits_go_through_memory() {
        let planner = Planner::new(GatedBackend::default());
        let day = Day::new(date(11));
        let _ = planner.update_day(day.clone());
        let (activity, _) = planner.add_activity(&day.id, ActivityType::Morning).unwrap();

        assert!(matches!(
            planner.add_segment(&day.id, &activity.id),
            Err(AppError::NotFound(_))
        ));

        let (transport, _) = planner.attach_transport(&day.id, &activity.id).unwrap();
        assert_eq!(transport.end_location, "Destination");
        assert!(transport.segments.is_empty());

        let (segment, _) = planner.add_segment(&day.id, &activity.id).unwrap();
        let mut express = segment.clone();
        express.line_name = "Line 2".to_string();
        let _ = planner
            .replace_segment(&day.id, &activity.id, 0, express)
            .unwrap();
        assert!(matches!(
            planner.replace_segment(&day.id, &activity.id, 3, segment),
            Err(AppError::NotFound(_))
        ));

        let stored = planner.day(&day.id).unwrap().activities[0]
            .transport
            .clone()
            .unwrap();
        assert_eq!(stored.line_badges(), vec!["Line 2"]);

        let (removed, _) = planner.remove_segment(&day.id, &activity.id, 0).unwrap();
        assert_eq!(removed.line_name, "Line 2");
        assert!(matches!(
            planner.remove_segment(&day.id, &activity.id, 0),
            Err(AppError::NotFound(_))
        ));

        let _ = planner.remove_transport(&day.id, &activity.id).unwrap();
        assert!(planner.day(&day.id).unwrap().activities[0].transport.is_none());
        assert!(matches!(
            planner.remove_transport(&day.id, &activity.id),
            Err(AppError::NotFound(_))
        ));
    }
}
