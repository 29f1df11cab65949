use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::services::google_auth::TokenSource;

#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_user(&self, new_user: &NewIdentity) -> AppResult<IdentityUser>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<IdentityUser>>;
}

/// Firebase Auth through the Identity Toolkit admin REST API.
pub struct FirebaseIdentity {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenSource>, base_url: &str) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn accounts_url(&self, suffix: &str) -> String {
        format!(
            "{}/projects/{}/accounts{}",
            self.base_url,
            self.tokens.project_id(),
            suffix
        )
    }

    async fn call(&self, url: String, body: serde_json::Value) -> AppResult<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Identity provider unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(failure(status, &text))
    }
}

/// Only a 400 is the provider rejecting the operation itself. Auth, quota
/// and server failures are ours or theirs, never the caller's.
fn failure(status: reqwest::StatusCode, body: &str) -> AppError {
    if status == reqwest::StatusCode::BAD_REQUEST {
        AppError::Provider(provider_message(body))
    } else {
        AppError::Upstream(format!("Identity provider error {}: {}", status, body))
    }
}

/// Extracts the provider's error code (e.g. `EMAIL_EXISTS`) from an error body.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| "Identity provider rejected the request".into())
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn create_user(&self, new_user: &NewIdentity) -> AppResult<IdentityUser> {
        let body = serde_json::to_value(SignUpBody {
            email: &new_user.email,
            password: &new_user.password,
            display_name: &new_user.display_name,
        })
        .map_err(anyhow::Error::from)?;

        let account: AccountInfo = self
            .call(self.accounts_url(""), body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed sign-up response: {}", e)))?;

        Ok(IdentityUser {
            uid: account.local_id,
            email: new_user.email.clone(),
            display_name: Some(new_user.display_name.clone()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<IdentityUser>> {
        let lookup: LookupResponse = self
            .call(self.accounts_url(":lookup"), json!({ "email": [email] }))
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed lookup response: {}", e)))?;

        Ok(lookup.users.into_iter().next().map(|account| IdentityUser {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            display_name: account.display_name,
        }))
    }
}
