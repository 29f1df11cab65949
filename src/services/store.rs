//! Hierarchical key-path store abstraction.
//!
//! Values are JSON trees addressed by `/`-separated paths. Writing `null`
//! removes a path, and parents left empty disappear with it. Reads can
//! return an opaque version tag (ETag) that later writes may be
//! conditioned on.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, AppResult};

const MAX_SEGMENT_BYTES: usize = 768;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// `users`
    pub fn users() -> Self {
        Self(vec!["users".into()])
    }

    /// `users/{uid}`
    pub fn user(uid: &str) -> AppResult<Self> {
        Self::users().join(uid)
    }

    pub fn join(mut self, segment: impl Into<String>) -> AppResult<Self> {
        let segment = segment.into();
        validate_segment(&segment)?;
        self.0.push(segment);
        Ok(self)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

fn validate_segment(segment: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::Validation("Path segment must not be empty".into()));
    }
    if segment.len() > MAX_SEGMENT_BYTES {
        return Err(AppError::Validation("Path segment too long".into()));
    }
    if segment
        .chars()
        .any(|c| matches!(c, '/' | '.' | '$' | '#' | '[' | ']') || c.is_ascii_control())
    {
        return Err(AppError::Validation(format!(
            "Invalid characters in path segment '{}'",
            segment
        )));
    }
    Ok(())
}

/// A value together with the version tag it was read at.
#[derive(Debug, Clone)]
pub struct Versioned {
    pub value: Option<Value>,
    pub etag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The stored value changed since the version tag was issued.
    Conflict,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, path: &StorePath) -> AppResult<Option<Value>>;

    async fn get_versioned(&self, path: &StorePath) -> AppResult<Versioned>;

    /// Replace the value at `path`. Writing `Value::Null` deletes it.
    async fn set(&self, path: &StorePath, value: &Value) -> AppResult<()>;

    /// Replace the value at `path` only if it is still at version `etag`.
    async fn set_if(&self, path: &StorePath, value: &Value, etag: &str) -> AppResult<WriteOutcome>;

    async fn delete(&self, path: &StorePath) -> AppResult<()> {
        self.set(path, &Value::Null).await
    }

    /// Whether anything is stored at or below `path`, without reading the subtree.
    async fn exists(&self, path: &StorePath) -> AppResult<bool>;
}
