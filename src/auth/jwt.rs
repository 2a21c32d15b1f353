//! Token verification
//!
//! Tokens are issued by the external auth provider and signed with a
//! shared HS256 secret. This service only verifies them.

use crate::error::AppError;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Role name that implies every permission
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID at the auth provider)
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Role name, matches a row in `roles`
    pub role: String,
    /// Permissions granted on top of the role; the role's stored
    /// permissions are merged in by the auth middleware
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == permission)
    }
}

/// Decode and validate a bearer token
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired".to_string()),
        ErrorKind::InvalidToken | ErrorKind::InvalidSignature => {
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Unauthorized(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "test-secret";

    /// Sign a token the way the auth provider would
    pub fn issue_token(role: &str, permissions: &[&str], exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            email: Some("editor@hackerthink.com".to_string()),
            name: None,
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: now + exp_offset_secs,
            iat: Some(now),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_decode_valid_token() {
        let token = issue_token("editor", &["articles:write"], 600);
        let claims = decode_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.role, "editor");
        assert!(claims.has_permission("articles:write"));
        assert!(!claims.has_permission("roles:manage"));
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_has_every_permission() {
        let token = issue_token(ADMIN_ROLE, &[], 600);
        let claims = decode_token(&token, TEST_SECRET).unwrap();
        assert!(claims.has_permission("smtp:manage"));
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let token = issue_token("admin", &[], 600);
        assert!(matches!(decode_token(&token, "other"), Err(AppError::Unauthorized(_))));

        let expired = issue_token("admin", &[], -3600);
        assert!(matches!(decode_token(&expired, TEST_SECRET), Err(AppError::Unauthorized(_))));

        assert!(decode_token("not-a-jwt", TEST_SECRET).is_err());
    }
}
