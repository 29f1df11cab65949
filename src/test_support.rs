//! In-process application harness for handler tests.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::auth::rate_limit::RateLimitState;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::services::completion::CompletionModel;
use crate::services::memory::{MemoryIdentity, MemoryStore};
use crate::services::store::Store;
use crate::{routes, AppState};

pub const ADMIN_SECRET: &str = "test-admin-secret";

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Completion double that records prompts and replays a fixed outcome.
pub struct ScriptedModel {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AppError) -> Self {
        Self {
            reply: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.reply.clone().map_err(AppError::Upstream)
    }
}

pub struct TestApp {
    router: Router,
    pub store: Arc<dyn Store>,
    pub model: Arc<ScriptedModel>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(
            Config::for_tests(),
            Arc::new(MemoryStore::new()),
            ScriptedModel::replying("scripted reply"),
        )
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self::build(Config::for_tests(), store, ScriptedModel::replying("scripted reply"))
    }

    pub fn with_model(model: ScriptedModel) -> Self {
        Self::build(Config::for_tests(), Arc::new(MemoryStore::new()), model)
    }

    pub fn with_config_and_store(config: Config, store: Arc<dyn Store>) -> Self {
        Self::build(config, store, ScriptedModel::replying("scripted reply"))
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(
            config,
            Arc::new(MemoryStore::new()),
            ScriptedModel::replying("scripted reply"),
        )
    }

    fn build(config: Config, store: Arc<dyn Store>, model: ScriptedModel) -> Self {
        let model = Arc::new(model);
        let state = AppState {
            rate_limiter: RateLimitState::new(
                config.auth_rate_limit_max,
                config.auth_rate_limit_window_secs,
            ),
            config: Arc::new(config),
            store: store.clone(),
            identity: Arc::new(MemoryIdentity::new()),
            model: model.clone(),
        };
        let router = routes::router(state)
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        Self {
            router,
            store,
            model,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is JSON")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_with_token(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }
}
