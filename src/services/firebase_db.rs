use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::services::google_auth::TokenSource;
use crate::services::store::{Store, StorePath, Versioned, WriteOutcome};

/// Firebase Realtime Database over its REST API.
pub struct FirebaseStore {
    http: reqwest::Client,
    tokens: Arc<TokenSource>,
    database_url: Url,
}

impl FirebaseStore {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenSource>,
        database_url: &str,
    ) -> anyhow::Result<Self> {
        let database_url = Url::parse(database_url)
            .map_err(|e| anyhow::anyhow!("Invalid FIREBASE_DATABASE_URL '{}': {}", database_url, e))?;
        if database_url.cannot_be_a_base() {
            anyhow::bail!("FIREBASE_DATABASE_URL must be an http(s) URL");
        }
        Ok(Self {
            http,
            tokens,
            database_url,
        })
    }

    async fn request(&self, method: Method, path: &StorePath) -> AppResult<reqwest::RequestBuilder> {
        let url = resource_url(&self.database_url, path)?;
        let token = self.tokens.access_token().await?;
        Ok(self
            .http
            .request(method, url)
            .query(&[("access_token", token)]))
    }
}

/// `{db}/{segment}/.../{last}.json`, every segment percent-encoded.
fn resource_url(database_url: &Url, path: &StorePath) -> AppResult<Url> {
    let mut url = database_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Database URL cannot carry a path")))?;
        segments.pop_if_empty();
        match path.segments().split_last() {
            Some((last, parents)) => {
                segments.extend(parents);
                segments.push(&format!("{}.json", last));
            }
            None => {
                segments.push(".json");
            }
        }
    }
    Ok(url)
}

fn store_error(path: &StorePath, e: impl std::fmt::Display) -> AppError {
    AppError::Store(format!("{}: {}", path, e))
}

async fn ensure_success(path: &StorePath, response: reqwest::Response) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(store_error(path, format!("HTTP {}: {}", status, body)))
}

/// The REST API answers `null` for absent paths.
fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

#[async_trait]
impl Store for FirebaseStore {
    async fn get(&self, path: &StorePath) -> AppResult<Option<Value>> {
        let response = self
            .request(Method::GET, path)
            .await?
            .send()
            .await
            .map_err(|e| store_error(path, e))?;
        let value: Value = ensure_success(path, response)
            .await?
            .json()
            .await
            .map_err(|e| store_error(path, e))?;
        Ok(non_null(value))
    }

    async fn get_versioned(&self, path: &StorePath) -> AppResult<Versioned> {
        let response = self
            .request(Method::GET, path)
            .await?
            .header("X-Firebase-ETag", "true")
            .send()
            .await
            .map_err(|e| store_error(path, e))?;
        let response = ensure_success(path, response).await?;

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| store_error(path, "response carried no ETag"))?;
        let value: Value = response.json().await.map_err(|e| store_error(path, e))?;

        Ok(Versioned {
            value: non_null(value),
            etag,
        })
    }

    async fn set(&self, path: &StorePath, value: &Value) -> AppResult<()> {
        let builder = if value.is_null() {
            self.request(Method::DELETE, path).await?
        } else {
            self.request(Method::PUT, path).await?.json(value)
        };
        let response = builder.send().await.map_err(|e| store_error(path, e))?;
        ensure_success(path, response).await?;
        Ok(())
    }

    async fn set_if(&self, path: &StorePath, value: &Value, etag: &str) -> AppResult<WriteOutcome> {
        let response = self
            .request(Method::PUT, path)
            .await?
            .header("if-match", etag)
            .json(value)
            .send()
            .await
            .map_err(|e| store_error(path, e))?;

        if response.status() == StatusCode::PRECONDITION_FAILED {
            return Ok(WriteOutcome::Conflict);
        }
        ensure_success(path, response).await?;
        Ok(WriteOutcome::Applied)
    }

    async fn exists(&self, path: &StorePath) -> AppResult<bool> {
        let response = self
            .request(Method::GET, path)
            .await?
            .query(&[("shallow", "true")])
            .send()
            .await
            .map_err(|e| store_error(path, e))?;
        let value: Value = ensure_success(path, response)
            .await?
            .json()
            .await
            .map_err(|e| store_error(path, e))?;
        Ok(!value.is_null())
    }
}
