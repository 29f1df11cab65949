use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AdminUser;
use crate::dto::{ListUsersRequest, ListUsersResponse};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::user::user_listings;
use crate::services::store::StorePath;
use crate::AppState;

/// Lists every registered user. The body's `admin_id` must be the subject
/// of the verified admin token.
pub async fn get_all_users(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    ValidJson(body): ValidJson<ListUsersRequest>,
) -> AppResult<Json<ListUsersResponse>> {
    if body.admin_id != admin.id {
        tracing::warn!(
            token_sub = %admin.id,
            admin_id = %body.admin_id,
            "admin_id does not match token subject"
        );
        return Err(AppError::Forbidden);
    }

    // TODO: page through users with shallow reads; this loads every journal.
    let users = user_listings(state.store.get(&StorePath::users()).await?);
    tracing::info!(admin_id = %admin.id, count = users.len(), "Listed users");

    Ok(Json(ListUsersResponse {
        success: true,
        users,
    }))
}
