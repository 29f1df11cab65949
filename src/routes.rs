use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::{auth, handlers, AppState};

pub fn router(state: AppState) -> Router {
    // Sign-up and sign-in are rate limited per client IP and path
    let auth_routes = Router::new()
        .route("/api/signup", post(handlers::auth::signup))
        .route("/api/signin", post(handlers::auth::signin))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let admin_routes = Router::new()
        .route("/api/get_all_users", post(handlers::admin::get_all_users))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_admin,
        ));

    let journal_routes = Router::new()
        .route("/api/save_mood", post(handlers::moods::save_mood))
        .route("/api/get_moods", post(handlers::moods::get_moods))
        .route("/api/delete_mood", post(handlers::moods::delete_mood))
        .route("/api/delete_all_moods", post(handlers::moods::delete_all_moods))
        .route("/api/get_summary", post(handlers::summary::get_summary))
        .route("/api/ai_chat", post(handlers::chat::ai_chat));

    let public_routes = Router::new()
        .route("/", get(handlers::health::index))
        .route("/api/health", get(handlers::health::health_check));

    let cors = cors_layer(&state.config.cors_allowed_origins);
    let request_timeout = state.config.request_timeout();

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(journal_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request exceeded the configured timeout");
        AppError::Timeout
    } else {
        AppError::Internal(anyhow::anyhow!("Unhandled middleware error: {}", err))
    }
}

/// Any origin unless an allow-list is configured; the mobile client sends no Origin.
fn cors_layer(allowed: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if allowed.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
