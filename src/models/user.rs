//! User (principal) domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account, the authenticated principal.
///
/// The account owns its current token material: at most one live token per
/// user, stored as a public identifier plus a one-way hash of the secret.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,

    // Token material
    #[serde(skip_serializing)]
    pub token_id: Option<String>,
    #[serde(skip_serializing)]
    pub token_hash: Option<String>,
    pub token_expires: Option<DateTime<Utc>>,

    // Metadata
    pub last_login: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the stored token is still within its TTL at `now`
    pub fn has_live_token(&self, now: DateTime<Utc>) -> bool {
        self.token_hash.is_some() && self.token_expires.is_some_and(|expires| expires > now)
    }
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Token material written atomically on issuance
#[derive(Debug, Clone)]
pub struct TokenMaterial {
    /// `None` for opaque (legacy) tokens
    pub token_id: Option<String>,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

/// User response (without sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub last_login: DateTime<Utc>,
    pub token_expires: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            last_login: user.last_login,
            token_expires: user.token_expires,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        user.clone().into()
    }
}

/// Public listing entry
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub email: String,
    pub name: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            email: "test@example.com".to_string(),
            name: Some("Test".to_string()),
            password_hash: "$argon2id$...".to_string(),
            token_id: Some("0123456789abcdef".to_string()),
            token_hash: Some("$pbkdf2-sha256$...".to_string()),
            token_expires: Some(now + Duration::days(2)),
            last_login: now,
            created_at: now,
        }
    }

    #[test]
    fn test_has_live_token() {
        let user = user();
        let now = Utc::now();

        assert!(user.has_live_token(now));
        assert!(!user.has_live_token(now + Duration::days(3)));

        let cleared = User {
            token_hash: None,
            ..user
        };
        assert!(!cleared.has_live_token(now));
    }

    #[test]
    fn test_serialization_hides_credentials() {
        let json = serde_json::to_value(user()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("token_hash").is_none());
        assert!(json.get("token_id").is_none());
        assert_eq!(json["email"], "test@example.com");
    }

    #[test]
    fn test_user_response_from_user() {
        let response = UserResponse::from(user());
        assert_eq!(response.id, 1);
        assert_eq!(response.name.as_deref(), Some("Test"));
        assert!(response.token_expires.is_some());
    }
}
