//! Token issuance
//!
//! Split tokens have the form `<identifier>:<secret>`: the identifier is a
//! public lookup key (16 hex chars), the secret is 256 bits of URL-safe base64.
//! Opaque (legacy) tokens are 64 hex chars with no identifier. In both cases
//! only a hash of the secret is stored, and issuing a token overwrites the
//! previous one, so each user has at most one live token.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use secrecy::Secret;
use std::sync::Arc;

use crate::{
    auth::{clock::Clock, hasher::CredentialHasher},
    error::AppError,
    models::user::{TokenMaterial, User},
    repository::{PrincipalStore, StoreError, UniqueField},
};

/// Separator between identifier and secret
pub const TOKEN_SEPARATOR: char = ':';

const IDENTIFIER_BYTES: usize = 8;
const SECRET_BYTES: usize = 32;
const OPAQUE_BYTES: usize = 32;

/// Token scheme accepted by a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScheme {
    /// `identifier:secret`, resolved by indexed lookup
    Split,
    /// Whole-token hash, resolved by scanning live tokens
    Opaque,
}

impl TokenScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScheme::Split => "split",
            TokenScheme::Opaque => "opaque",
        }
    }
}

/// Freshly issued token. The plaintext token is only ever handed to the caller.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: Secret<String>,
    pub token_id: Option<String>,
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
    /// The user as persisted after the write
    pub user: User,
}

/// Generate a random public identifier (16 hex chars)
pub fn generate_identifier() -> String {
    let mut bytes = [0u8; IDENTIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a random secret (256 bits, URL-safe base64 without padding)
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate an opaque legacy token (64 hex chars)
pub fn generate_opaque() -> String {
    let mut bytes = [0u8; OPAQUE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Split `identifier:secret`; `None` unless there is exactly one separator
/// with non-empty halves
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (identifier, secret) = token.split_once(TOKEN_SEPARATOR)?;
    if identifier.is_empty() || secret.is_empty() || secret.contains(TOKEN_SEPARATOR) {
        return None;
    }
    Some((identifier, secret))
}

pub struct TokenIssuer {
    store: Arc<dyn PrincipalStore>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_attempts: u32,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        hasher: CredentialHasher,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            hasher,
            clock,
            ttl,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token of the given scheme
    pub async fn issue_for(&self, user: &User, scheme: TokenScheme) -> Result<IssuedToken, AppError> {
        match scheme {
            TokenScheme::Split => self.issue(user).await,
            TokenScheme::Opaque => self.issue_opaque(user).await,
        }
    }

    /// Issue a split `identifier:secret` token, replacing any previous token.
    ///
    /// A clash on the identifier regenerates the pair and retries.
    pub async fn issue(&self, user: &User) -> Result<IssuedToken, AppError> {
        for attempt in 1..=self.max_attempts {
            let token_id = generate_identifier();
            let secret = generate_secret();
            let full_token = format!("{}{}{}", token_id, TOKEN_SEPARATOR, secret);

            let material = self.material(Some(token_id.clone()), secret).await?;

            match self.store.save_token(user.id, &material).await {
                Ok(saved) => {
                    metrics::counter!("tokens_issued_total", "scheme" => "split").increment(1);
                    tracing::info!(user_id = user.id, token_id = %token_id, "Token issued");

                    return Ok(IssuedToken {
                        token: Secret::new(full_token),
                        token_id: Some(token_id),
                        secret_hash: material.token_hash,
                        expires_at: material.expires_at,
                        user: saved,
                    });
                }
                Err(StoreError::Conflict(UniqueField::TokenId)) => {
                    tracing::warn!(user_id = user.id, attempt, "Token identifier collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(user_id = user.id, "Token identifier collisions exhausted retries");
        Err(AppError::Internal(
            "failed to allocate a unique token identifier".to_string(),
        ))
    }

    /// Issue an opaque legacy token. Clears the stored identifier, so a split
    /// token issued earlier dies as well.
    pub async fn issue_opaque(&self, user: &User) -> Result<IssuedToken, AppError> {
        let raw = generate_opaque();
        let material = self.material(None, raw.clone()).await?;
        let saved = self.store.save_token(user.id, &material).await?;

        metrics::counter!("tokens_issued_total", "scheme" => "opaque").increment(1);
        tracing::info!(user_id = user.id, "Opaque token issued");

        Ok(IssuedToken {
            token: Secret::new(raw),
            token_id: None,
            secret_hash: material.token_hash,
            expires_at: material.expires_at,
            user: saved,
        })
    }

    async fn material(
        &self,
        token_id: Option<String>,
        secret: String,
    ) -> Result<TokenMaterial, AppError> {
        let token_hash = self.hasher.spawn_hash(secret).await?;
        let issued_at = self.clock.now();

        Ok(TokenMaterial {
            token_id,
            token_hash,
            expires_at: issued_at + self.ttl,
            issued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_identifier() {
        let id = generate_identifier();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_identifier());
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(secret.len(), 43);
        assert!(!secret.contains(TOKEN_SEPARATOR));
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_opaque() {
        let token = generate_opaque();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("abc:def"), Some(("abc", "def")));
        assert_eq!(split_token("abc"), None);
        assert_eq!(split_token(":def"), None);
        assert_eq!(split_token("abc:"), None);
        assert_eq!(split_token("a:b:c"), None);
    }

    #[test]
    fn test_issued_token_debug_is_redacted() {
        let now = Utc::now();
        let issued = IssuedToken {
            token: Secret::new("0123456789abcdef:plaintext-secret".to_string()),
            token_id: Some("0123456789abcdef".to_string()),
            secret_hash: "$pbkdf2-sha256$i=1000$salt$hash".to_string(),
            expires_at: now,
            user: User {
                id: 1,
                email: "a@example.com".to_string(),
                name: None,
                password_hash: String::new(),
                token_id: None,
                token_hash: None,
                token_expires: None,
                last_login: now,
                created_at: now,
            },
        };

        let debug = format!("{:?}", issued);
        assert!(debug.contains("0123456789abcdef"));
        assert!(!debug.contains("plaintext-secret"));
    }
}
