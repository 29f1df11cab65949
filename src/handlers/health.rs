use axum::Json;
use chrono::Utc;

use crate::dto::{HealthResponse, IndexResponse};

pub const ENDPOINTS: [&str; 10] = [
    "/api/signup",
    "/api/signin",
    "/api/save_mood",
    "/api/get_moods",
    "/api/delete_mood",
    "/api/delete_all_moods",
    "/api/get_summary",
    "/api/ai_chat",
    "/api/get_all_users",
    "/api/health",
];

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Mood Tracker API".into(),
        version: "1.0".into(),
        endpoints: ENDPOINTS.to_vec(),
    })
}
