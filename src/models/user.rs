use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile written at `users/{uid}` on sign-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub fullname: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserListing {
    pub user_id: String,
    pub email: Option<String>,
    pub fullname: Option<String>,
}

/// The stored user node without the journal subtree.
pub fn profile_view(node: Option<Value>) -> Value {
    match node {
        Some(Value::Object(mut fields)) => {
            fields.remove("moods");
            Value::Object(fields)
        }
        Some(other) => other,
        None => Value::Null,
    }
}

pub fn user_listings(users: Option<Value>) -> Vec<UserListing> {
    let Some(Value::Object(users)) = users else {
        return Vec::new();
    };

    users
        .into_iter()
        .map(|(user_id, node)| {
            let field = |name: &str| node.get(name).and_then(Value::as_str).map(String::from);
            UserListing {
                email: field("email"),
                fullname: field("fullname"),
                user_id,
            }
        })
        .collect()
}
