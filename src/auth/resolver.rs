//! Token resolution
//!
//! A resolver turns the credential part of an `Authorization` header into the
//! principal that owns it. `IndexedResolver` handles split tokens with one
//! indexed lookup; `ScanResolver` handles opaque legacy tokens by testing the
//! token against every live token hash.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    auth::{
        clock::Clock,
        hasher::CredentialHasher,
        token::{split_token, TokenScheme},
    },
    models::user::User,
    repository::{PrincipalStore, StoreError},
};

/// Authentication failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Token not provided")]
    Missing,

    #[error("Invalid token format")]
    Malformed,

    /// Unknown identifier and wrong secret are deliberately the same case
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Authentication backend error: {0}")]
    Backend(String),
}

impl AuthError {
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Malformed => "malformed",
            AuthError::Invalid => "invalid",
            AuthError::Expired => "expired",
            AuthError::Backend(_) => "error",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait TokenResolver: Send + Sync {
    fn scheme(&self) -> TokenScheme;

    /// Resolve a credential (header value with the scheme prefix removed)
    async fn resolve(&self, credential: &str) -> Result<User, AuthError>;
}

/// Resolves `identifier:secret` tokens through the unique identifier index
pub struct IndexedResolver {
    store: Arc<dyn PrincipalStore>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
}

impl IndexedResolver {
    pub fn new(store: Arc<dyn PrincipalStore>, hasher: CredentialHasher, clock: Arc<dyn Clock>) -> Self {
        Self { store, hasher, clock }
    }
}

#[async_trait]
impl TokenResolver for IndexedResolver {
    fn scheme(&self) -> TokenScheme {
        TokenScheme::Split
    }

    async fn resolve(&self, credential: &str) -> Result<User, AuthError> {
        let (token_id, secret) = split_token(credential).ok_or(AuthError::Malformed)?;

        let found = self.store.find_by_token_identifier(token_id).await?;

        let Some((user, token_hash)) =
            found.and_then(|u| u.token_hash.clone().map(|hash| (u, hash)))
        else {
            self.hasher.spawn_verify_placeholder(secret.to_string()).await;
            return Err(AuthError::Invalid);
        };
        let matches = self
            .hasher
            .spawn_verify(secret.to_string(), token_hash)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        if !matches {
            tracing::debug!(token_id = %token_id, "Token secret mismatch");
            return Err(AuthError::Invalid);
        }

        if !user.has_live_token(self.clock.now()) {
            tracing::debug!(token_id = %token_id, user_id = user.id, "Token expired");
            return Err(AuthError::Expired);
        }

        Ok(user)
    }
}

/// Resolves opaque tokens by scanning every unexpired token.
///
/// Cost is linear in the number of live tokens, each candidate costing one
/// hash verification.
pub struct ScanResolver {
    store: Arc<dyn PrincipalStore>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
}

impl ScanResolver {
    pub fn new(store: Arc<dyn PrincipalStore>, hasher: CredentialHasher, clock: Arc<dyn Clock>) -> Self {
        Self { store, hasher, clock }
    }
}

#[async_trait]
impl TokenResolver for ScanResolver {
    fn scheme(&self) -> TokenScheme {
        TokenScheme::Opaque
    }

    async fn resolve(&self, credential: &str) -> Result<User, AuthError> {
        if credential.is_empty() || credential.chars().any(char::is_whitespace) {
            return Err(AuthError::Malformed);
        }

        let candidates = self
            .store
            .find_all_with_unexpired_token(self.clock.now())
            .await?;

        tracing::debug!(candidates = candidates.len(), "Scanning opaque tokens");

        let hasher = self.hasher.clone();
        let token = credential.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            candidates.into_iter().find(|user| {
                user.token_hash
                    .as_deref()
                    .map(|hash| hasher.verify(token.as_bytes(), hash))
                    .unwrap_or(false)
            })
        })
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?;

        let user = matched.ok_or(AuthError::Invalid)?;

        // The clock may have moved past expiry during the scan
        if !user.has_live_token(self.clock.now()) {
            return Err(AuthError::Expired);
        }

        Ok(user)
    }
}
