use axum::{extract::State, Json};

use crate::dto::{ChatRequest, ChatResponse};
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::models::mood::moods_path;
use crate::AppState;

const PREAMBLE: &str = "You are a supportive mental health assistant for a mood tracking app. \
Be empathetic, encouraging, and provide helpful insights about mood patterns. ";

const MOOD_DATA_NOTE: &str = "\n\nUser's recent mood data is available. ";

/// Only the existence of history is mentioned; entries never reach the model.
fn build_prompt(has_mood_data: bool, message: &str) -> String {
    let mut context = String::from(PREAMBLE);
    if has_mood_data {
        context.push_str(MOOD_DATA_NOTE);
    }
    format!("{}\n\nUser: {}\n\nAssistant:", context, message)
}

pub async fn ai_chat(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let has_mood_data = state.store.exists(&moods_path(&body.user_id)?).await?;
    let prompt = build_prompt(has_mood_data, &body.message);

    let response = state.model.generate(&prompt).await?;
    tracing::debug!(user_id = %body.user_id, has_mood_data, "AI chat response generated");

    Ok(Json(ChatResponse {
        success: true,
        response,
    }))
}
