use axum::{extract::State, Json};
use chrono::Utc;

use crate::dto::{SigninRequest, SigninResponse, SignupRequest, SignupResponse};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::user::{profile_view, UserRecord};
use crate::services::identity::NewIdentity;
use crate::services::store::StorePath;
use crate::AppState;

pub async fn signup(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    let user = state
        .identity
        .create_user(&NewIdentity {
            email: body.email.clone(),
            password: body.password,
            display_name: body.fullname.clone(),
        })
        .await?;

    let record = UserRecord {
        email: body.email,
        fullname: body.fullname,
        created_at: Utc::now(),
    };
    let profile = serde_json::to_value(&record).map_err(anyhow::Error::from)?;

    // The identity record is not rolled back if this write fails.
    if let Err(e) = state.store.set(&StorePath::user(&user.uid)?, &profile).await {
        tracing::error!(
            user_id = %user.uid,
            error = %e,
            "Identity created but profile write failed"
        );
        return Err(e);
    }

    tracing::info!(user_id = %user.uid, "User registered");

    Ok(Json(SignupResponse {
        success: true,
        user_id: user.uid,
        message: "User created successfully".into(),
    }))
}

/// Profile lookup only; the client has already authenticated with the identity provider.
pub async fn signin(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SigninRequest>,
) -> AppResult<Json<SigninResponse>> {
    let user = state
        .identity
        .get_user_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::NotFound("No user record found for this email".into()))?;

    let node = state.store.get(&StorePath::user(&user.uid)?).await?;
    tracing::debug!(
        user_id = %user.uid,
        display_name = ?user.display_name,
        has_profile = node.is_some(),
        "Profile lookup"
    );

    Ok(Json(SigninResponse {
        success: true,
        user_id: user.uid,
        user_data: profile_view(node),
    }))
}
