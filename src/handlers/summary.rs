use axum::{extract::State, Json};

use crate::dto::{SummaryRequest, SummaryResponse};
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::models::mood::{month_days, month_path, render_summary, tally};
use crate::AppState;

pub async fn get_summary(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SummaryRequest>,
) -> AppResult<Json<SummaryResponse>> {
    let days = body.mode.days(body.value)?;
    let path = month_path(&body.user_id, body.year, body.month)?;

    let month = month_days(state.store.get(&path).await?);
    let mood_counts = tally(&month, days.as_ref());
    let summary = render_summary(body.mode, &mood_counts);

    Ok(Json(SummaryResponse {
        success: true,
        summary,
        mood_counts,
    }))
}
