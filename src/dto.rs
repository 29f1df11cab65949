//! # Mood Tracker: Request/Response DTOs
//!
//! All API contract types in one module. Field names match the JSON the
//! mobile client already sends, so they are snake_case throughout.
//!
//! Conventions:
//! - `*Request`  → deserialized from the client JSON body
//! - `*Response` → serialized to client JSON, always carrying `success`
//! - Validation is expressed via `validator` derive macros
//! - Calendar fields accept JSON numbers or numeric strings

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::mood::SummaryMode;
use crate::models::user::UserListing;

// ============================================================================
// Common
// ============================================================================

/// `{success: true, message}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

mod flexible_int {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    fn parse<E: de::Error>(raw: IntOrString) -> Result<Option<i64>, E> {
        match raw {
            IntOrString::Int(n) => Ok(Some(n)),
            IntOrString::Str(s) if s.trim().is_empty() => Ok(None),
            IntOrString::Str(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| E::custom(format!("expected an integer, got '{}'", s))),
        }
    }

    pub fn required<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        parse::<D::Error>(IntOrString::deserialize(d)?)?
            .ok_or_else(|| de::Error::custom("expected an integer, got an empty string"))
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<IntOrString>::deserialize(d)? {
            Some(raw) => parse(raw),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// POST /api/signup
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub fullname: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub user_id: String,
    pub message: String,
}

/// POST /api/signin
#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub success: bool,
    pub user_id: String,
    /// Stored profile, `null` if the profile write never happened
    pub user_data: Value,
}

// ============================================================================
// Mood journal
// ============================================================================

/// POST /api/save_mood
#[derive(Debug, Deserialize, Validate)]
pub struct SaveMoodRequest {
    pub user_id: String,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 9999, message = "Year must be 1-9999"))]
    pub year: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 12, message = "Month must be 1-12"))]
    pub month: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 31, message = "Day must be 1-31"))]
    pub day: i64,

    #[validate(length(min = 1, max = 100, message = "Mood must be 1-100 characters"))]
    pub mood: String,

    #[validate(length(max = 5000, message = "Note must be under 5000 characters"))]
    pub note: Option<String>,
}

/// POST /api/get_moods, whole month when `day` is absent
#[derive(Debug, Deserialize, Validate)]
pub struct GetMoodsRequest {
    pub user_id: String,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 9999, message = "Year must be 1-9999"))]
    pub year: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 12, message = "Month must be 1-12"))]
    pub month: i64,

    #[serde(default, deserialize_with = "flexible_int::optional")]
    #[validate(range(min = 1, max = 31, message = "Day must be 1-31"))]
    pub day: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MoodsResponse {
    pub success: bool,
    /// A day's entry sequence, or a `day -> entries` object for a month
    pub moods: Value,
}

/// POST /api/delete_mood
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteMoodRequest {
    pub user_id: String,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 9999, message = "Year must be 1-9999"))]
    pub year: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 12, message = "Month must be 1-12"))]
    pub month: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 31, message = "Day must be 1-31"))]
    pub day: i64,

    /// Position in the day's sequence; range-checked against the stored value
    #[serde(deserialize_with = "flexible_int::required")]
    pub index: i64,
}

/// POST /api/delete_all_moods
#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAllMoodsRequest {
    pub user_id: String,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 9999, message = "Year must be 1-9999"))]
    pub year: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 12, message = "Month must be 1-12"))]
    pub month: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 31, message = "Day must be 1-31"))]
    pub day: i64,
}

// ============================================================================
// Summaries
// ============================================================================

/// POST /api/get_summary
///
/// `value` is the day (daily) or week of month 1-5 (weekly); ignored for monthly.
#[derive(Debug, Deserialize, Validate)]
pub struct SummaryRequest {
    pub user_id: String,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 9999, message = "Year must be 1-9999"))]
    pub year: i64,

    #[serde(deserialize_with = "flexible_int::required")]
    #[validate(range(min = 1, max = 12, message = "Month must be 1-12"))]
    pub month: i64,

    pub mode: SummaryMode,

    #[serde(default, deserialize_with = "flexible_int::optional")]
    pub value: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: String,
    pub mood_counts: BTreeMap<String, u64>,
}

// ============================================================================
// Assistant
// ============================================================================

/// POST /api/ai_chat
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,

    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
}

// ============================================================================
// Admin
// ============================================================================

/// POST /api/get_all_users; `admin_id` must match the bearer token's subject
#[derive(Debug, Deserialize, Validate)]
pub struct ListUsersRequest {
    #[validate(length(min = 1, message = "admin_id is required"))]
    pub admin_id: String,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub success: bool,
    pub users: Vec<UserListing>,
}

// ============================================================================
// System
// ============================================================================

/// GET /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// GET /
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: Vec<&'static str>,
}
