use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::{verify_token, Role};
use crate::error::AppError;
use crate::AppState;

/// Injected by `require_admin` into request extensions.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: String,
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // No secret configured: the admin surface is disabled.
    let secret = state
        .config
        .admin_jwt_secret
        .as_deref()
        .ok_or(AppError::Forbidden)?;

    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let token_data = verify_token(token, secret)?;

    if token_data.claims.role != Role::Admin {
        tracing::warn!(sub = %token_data.claims.sub, "Non-admin token presented to admin route");
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(AdminUser {
        id: token_data.claims.sub,
    });
    Ok(next.run(req).await)
}
