//! Mood journal handlers.
//!
//! A day's entries are one JSON array at the day path. Appends and
//! index-based deletes are read-modify-write cycles made safe against
//! concurrent writers by conditioning the write on the version read.
//! An index still refers to the caller's last view of the day, so a delete
//! that loses the race is reported as a conflict rather than retried.

use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::Value;

use crate::dto::{
    DeleteAllMoodsRequest, DeleteMoodRequest, GetMoodsRequest, MessageResponse, MoodsResponse,
    SaveMoodRequest,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::mood::{day_entries, day_path, month_days, month_path, MoodEntry};
use crate::services::store::WriteOutcome;
use crate::AppState;

const MAX_APPEND_ATTEMPTS: u32 = 3;

pub async fn save_mood(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SaveMoodRequest>,
) -> AppResult<Json<MessageResponse>> {
    let path = day_path(&body.user_id, body.year, body.month, body.day)?;
    let entry = serde_json::to_value(MoodEntry::new(body.mood, body.note, Utc::now()))
        .map_err(anyhow::Error::from)?;

    for attempt in 1..=MAX_APPEND_ATTEMPTS {
        let current = state.store.get_versioned(&path).await?;
        let mut entries = day_entries(current.value).unwrap_or_default();
        entries.push(entry.clone());

        match state.store.set_if(&path, &Value::Array(entries), &current.etag).await? {
            WriteOutcome::Applied => {
                tracing::info!(
                    user_id = %body.user_id,
                    year = body.year,
                    month = body.month,
                    day = body.day,
                    "Mood entry saved"
                );
                return Ok(Json(MessageResponse::ok("Mood saved successfully")));
            }
            WriteOutcome::Conflict => {
                tracing::debug!(path = %path, attempt, "Concurrent write on day, retrying");
            }
        }
    }

    Err(AppError::Conflict(
        "Mood entries for this day are being modified concurrently; please retry".into(),
    ))
}

pub async fn get_moods(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<GetMoodsRequest>,
) -> AppResult<Json<MoodsResponse>> {
    let moods = match body.day {
        Some(day) => {
            let path = day_path(&body.user_id, body.year, body.month, day)?;
            state
                .store
                .get(&path)
                .await?
                .unwrap_or_else(|| Value::Object(Default::default()))
        }
        None => {
            let path = month_path(&body.user_id, body.year, body.month)?;
            Value::Object(month_days(state.store.get(&path).await?))
        }
    };

    Ok(Json(MoodsResponse {
        success: true,
        moods,
    }))
}

pub async fn delete_mood(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<DeleteMoodRequest>,
) -> AppResult<Json<MessageResponse>> {
    let path = day_path(&body.user_id, body.year, body.month, body.day)?;
    let current = state.store.get_versioned(&path).await?;

    let mut entries = day_entries(current.value)
        .ok_or_else(|| AppError::Validation("Invalid index".into()))?;
    let index = usize::try_from(body.index)
        .ok()
        .filter(|i| *i < entries.len())
        .ok_or_else(|| AppError::Validation("Invalid index".into()))?;

    entries.remove(index);
    let remaining = if entries.is_empty() {
        Value::Null
    } else {
        Value::Array(entries)
    };

    match state.store.set_if(&path, &remaining, &current.etag).await? {
        WriteOutcome::Applied => {
            tracing::info!(user_id = %body.user_id, path = %path, index, "Mood entry deleted");
            Ok(Json(MessageResponse::ok("Mood deleted successfully")))
        }
        WriteOutcome::Conflict => Err(AppError::Conflict(
            "Mood entries changed since they were loaded; reload and retry".into(),
        )),
    }
}

pub async fn delete_all_moods(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<DeleteAllMoodsRequest>,
) -> AppResult<Json<MessageResponse>> {
    let path = day_path(&body.user_id, body.year, body.month, body.day)?;
    state.store.delete(&path).await?;

    tracing::info!(user_id = %body.user_id, path = %path, "All mood entries deleted for day");
    Ok(Json(MessageResponse::ok("All moods deleted successfully")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::error::AppResult;
    use crate::models::mood::day_path;
    use crate::services::memory::MemoryStore;
    use crate::services::store::{Store, StorePath, Versioned, WriteOutcome};
    use crate::test_support::TestApp;

    fn save(day: i64, mood: &str, note: Option<&str>) -> Value {
        let mut body = json!({"user_id": "u1", "year": 2024, "month": 3, "day": day, "mood": mood});
        if let Some(note) = note {
            body["note"] = json!(note);
        }
        body
    }

    fn day_query(day: i64) -> Value {
        json!({"user_id": "u1", "year": 2024, "month": 3, "day": day})
    }

    fn delete_at(index: i64) -> Value {
        json!({"user_id": "u1", "year": 2024, "month": 3, "day": 15, "index": index})
    }

    async fn moods_on(app: &TestApp, day: i64) -> Value {
        let (status, body) = app.post("/api/get_moods", day_query(day)).await;
        assert_eq!(status, StatusCode::OK);
        body["moods"].clone()
    }

    #[tokio::test]
    async fn test_save_then_get_day() {
        let app = TestApp::new();
        let (status, body) = app.post("/api/save_mood", save(15, "Happy", Some("Good day"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "message": "Mood saved successfully"}));

        let moods = moods_on(&app, 15).await;
        let entries = moods.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["mood"], "Happy");
        assert_eq!(entries[0]["note"], "Good day");
        let timestamp = entries[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_save_appends_in_order() {
        let app = TestApp::new();
        app.post("/api/save_mood", save(15, "Happy", None)).await;
        app.post("/api/save_mood", save(15, "Tired", None)).await;

        let moods = moods_on(&app, 15).await;
        let labels: Vec<&str> = moods
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["mood"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Happy", "Tired"]);
        assert_eq!(moods[1]["note"], "");
    }

    #[tokio::test]
    async fn test_save_replaces_non_sequence_value() {
        let app = TestApp::new();
        let path = day_path("u1", 2024, 3, 15).unwrap();
        app.store.set(&path, &json!({"legacy": true})).await.unwrap();

        app.post("/api/save_mood", save(15, "Calm", None)).await;

        let moods = moods_on(&app, 15).await;
        assert_eq!(moods.as_array().unwrap().len(), 1);
        assert_eq!(moods[0]["mood"], "Calm");
    }

    #[tokio::test]
    async fn test_get_month_without_writes_is_empty() {
        let app = TestApp::new();
        let (status, body) = app
            .post("/api/get_moods", json!({"user_id": "u1", "year": 2024, "month": 3}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "moods": {}}));
    }

    #[tokio::test]
    async fn test_get_missing_day_is_empty() {
        let app = TestApp::new();
        assert_eq!(moods_on(&app, 2).await, json!({}));
    }

    #[tokio::test]
    async fn test_get_month_groups_by_day() {
        let app = TestApp::new();
        app.post("/api/save_mood", save(1, "Sad", None)).await;
        app.post("/api/save_mood", save(15, "Happy", None)).await;

        let (_, body) = app
            .post("/api/get_moods", json!({"user_id": "u1", "year": "2024", "month": "3"}))
            .await;
        let month = body["moods"].as_object().unwrap();
        assert_eq!(month.len(), 2);
        assert_eq!(month["1"][0]["mood"], "Sad");
        assert_eq!(month["15"][0]["mood"], "Happy");
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one() {
        let app = TestApp::new();
        for mood in ["A", "B", "C"] {
            app.post("/api/save_mood", save(15, mood, None)).await;
        }

        let (status, body) = app.post("/api/delete_mood", delete_at(1)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Mood deleted successfully");

        let moods = moods_on(&app, 15).await;
        let labels: Vec<&str> = moods
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["mood"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_delete_last_entry_removes_day() {
        let app = TestApp::new();
        app.post("/api/save_mood", save(15, "Happy", None)).await;

        let (status, _) = app.post("/api/delete_mood", delete_at(0)).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(moods_on(&app, 15).await, json!({}));
        assert!(!app.store.exists(&StorePath::user("u1").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_out_of_bounds_leaves_day_unchanged() {
        let app = TestApp::new();
        app.post("/api/save_mood", save(15, "A", None)).await;
        app.post("/api/save_mood", save(15, "B", None)).await;
        let before = moods_on(&app, 15).await;

        for index in [2, -1] {
            let (status, body) = app.post("/api/delete_mood", delete_at(index)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"success": false, "error": "Invalid index"}));
        }

        assert_eq!(moods_on(&app, 15).await, before);
    }

    #[tokio::test]
    async fn test_delete_on_empty_day_is_invalid() {
        let app = TestApp::new();
        let (status, body) = app.post("/api/delete_mood", delete_at(0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid index");
    }

    #[tokio::test]
    async fn test_delete_all_is_idempotent() {
        let app = TestApp::new();
        app.post("/api/save_mood", save(15, "A", None)).await;
        app.post("/api/save_mood", save(16, "B", None)).await;

        for _ in 0..2 {
            let (status, body) = app.post("/api/delete_all_moods", day_query(15)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "All moods deleted successfully");
        }

        assert_eq!(moods_on(&app, 15).await, json!({}));
        assert_eq!(moods_on(&app, 16).await[0]["mood"], "B");
    }

    #[tokio::test]
    async fn test_user_id_cannot_escape_subtree() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/api/save_mood",
                json!({"user_id": "../admin", "year": 2024, "month": 3, "day": 15, "mood": "A"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_calendar_values_rejected() {
        let app = TestApp::new();
        let (status, body) = app
            .post(
                "/api/save_mood",
                json!({"user_id": "u1", "year": 2024, "month": 13, "day": 15, "mood": "A"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Month must be 1-12");
    }

    /// Store whose first `conflicts` conditional writes lose a race.
    struct RacingStore {
        inner: MemoryStore,
        conflicts: tokio::sync::Mutex<u32>,
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn get(&self, path: &StorePath) -> AppResult<Option<Value>> {
            self.inner.get(path).await
        }

        async fn get_versioned(&self, path: &StorePath) -> AppResult<Versioned> {
            self.inner.get_versioned(path).await
        }

        async fn set(&self, path: &StorePath, value: &Value) -> AppResult<()> {
            self.inner.set(path, value).await
        }

        async fn set_if(&self, path: &StorePath, value: &Value, etag: &str) -> AppResult<WriteOutcome> {
            let mut conflicts = self.conflicts.lock().await;
            if *conflicts > 0 {
                *conflicts -= 1;
                return Ok(WriteOutcome::Conflict);
            }
            self.inner.set_if(path, value, etag).await
        }

        async fn exists(&self, path: &StorePath) -> AppResult<bool> {
            self.inner.exists(path).await
        }
    }

    fn racing_app(conflicts: u32) -> (TestApp, Arc<RacingStore>) {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            conflicts: tokio::sync::Mutex::new(conflicts),
        });
        (TestApp::with_store(store.clone()), store)
    }

    #[tokio::test]
    async fn test_save_retries_after_conflict() {
        let (app, _) = racing_app(2);
        let (status, _) = app.post("/api/save_mood", save(15, "Happy", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moods_on(&app, 15).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_gives_up_after_repeated_conflicts() {
        let (app, _) = racing_app(3);
        let (status, body) = app.post("/api/save_mood", save(15, "Happy", None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(moods_on(&app, 15).await, json!({}));
    }

    #[tokio::test]
    async fn test_delete_conflict_is_not_retried() {
        let (app, store) = racing_app(0);
        app.post("/api/save_mood", save(15, "A", None)).await;
        app.post("/api/save_mood", save(15, "B", None)).await;

        *store.conflicts.lock().await = 1;
        let (status, body) = app.post("/api/delete_mood", delete_at(0)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        assert_eq!(moods_on(&app, 15).await.as_array().unwrap().len(), 2);
    }
}
