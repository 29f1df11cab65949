use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    /// The admin id this capability is bound to
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(other)]
    Other,
}

/// Issue an admin capability token valid for `ttl_secs`.
pub fn create_admin_token(admin_id: &str, ttl_secs: i64, secret: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = AdminClaims {
        sub: admin_id.to_string(),
        role: Role::Admin,
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create admin token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<TokenData<AdminClaims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_token_roundtrip() {
        let token = create_admin_token("admin-1", 300, "s3cret").unwrap();
        let data = verify_token(&token, "s3cret").unwrap();
        assert_eq!(data.claims.sub, "admin-1");
        assert_eq!(data.claims.role, Role::Admin);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_admin_token("admin-1", 300, "s3cret").unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        // Past the default 60s leeway.
        let token = create_admin_token("admin-1", -120, "s3cret").unwrap();
        assert!(matches!(verify_token(&token, "s3cret"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_unknown_role_parses_as_other() {
        let role: Role = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(role, Role::Other);
    }
}
