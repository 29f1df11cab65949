//! In-process store and identity provider. Used by `BACKEND=memory` and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::identity::{IdentityProvider, IdentityUser, NewIdentity};
use crate::services::store::{Store, StorePath, Versioned, WriteOutcome};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Default)]
pub struct MemoryStore {
    root: Arc<Mutex<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn etag_of(value: Option<&Value>) -> String {
    let serialized = value.map(Value::to_string).unwrap_or_else(|| "null".into());
    hex::encode(Sha256::digest(serialized.as_bytes()))
}

fn lookup<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match node {
        Value::Null => None,
        other => Some(other),
    }
}

fn write(root: &mut Value, path: &StorePath, value: &Value) {
    match path.segments().split_last() {
        None => {
            *root = value.clone();
        }
        Some((last, parents)) => {
            if value.is_null() {
                remove(root, path.segments());
                return;
            }
            // Intermediate non-objects are replaced, as the hosted store does.
            let mut node = root;
            for segment in parents {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                node = &mut node[segment.as_str()];
            }
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node[last.as_str()] = value.clone();
        }
    }
}

/// Removes `segments` below `node`, pruning objects left empty. Returns
/// whether `node` itself became empty.
fn remove(node: &mut Value, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return true;
    };
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    let child_empty = match map.get_mut(first) {
        Some(_) if rest.is_empty() => true,
        Some(child) => remove(child, rest),
        None => false,
    };
    if child_empty {
        map.remove(first);
    }
    map.is_empty()
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, path: &StorePath) -> AppResult<Option<Value>> {
        let root = self.root.lock().await;
        Ok(lookup(&root, path).cloned())
    }

    async fn get_versioned(&self, path: &StorePath) -> AppResult<Versioned> {
        let root = self.root.lock().await;
        let value = lookup(&root, path).cloned();
        let etag = etag_of(value.as_ref());
        Ok(Versioned { value, etag })
    }

    async fn set(&self, path: &StorePath, value: &Value) -> AppResult<()> {
        let mut root = self.root.lock().await;
        write(&mut root, path, value);
        Ok(())
    }

    async fn set_if(&self, path: &StorePath, value: &Value, etag: &str) -> AppResult<WriteOutcome> {
        let mut root = self.root.lock().await;
        if etag_of(lookup(&root, path)) != etag {
            return Ok(WriteOutcome::Conflict);
        }
        write(&mut root, path, value);
        Ok(WriteOutcome::Applied)
    }

    async fn exists(&self, path: &StorePath) -> AppResult<bool> {
        let root = self.root.lock().await;
        Ok(lookup(&root, path).is_some())
    }
}

#[derive(Clone, Default)]
pub struct MemoryIdentity {
    users: Arc<Mutex<HashMap<String, IdentityUser>>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_user(&self, new_user: &NewIdentity) -> AppResult<IdentityUser> {
        if new_user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Provider(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }

        let key = new_user.email.to_lowercase();
        let mut users = self.users.lock().await;
        if users.contains_key(&key) {
            return Err(AppError::Provider("EMAIL_EXISTS".into()));
        }

        let user = IdentityUser {
            uid: Uuid::new_v4().simple().to_string(),
            email: new_user.email.clone(),
            display_name: Some(new_user.display_name.clone()),
        };
        users.insert(key, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<IdentityUser>> {
        let users = self.users.lock().await;
        Ok(users.get(&email.to_lowercase()).cloned())
    }
}
