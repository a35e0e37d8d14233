//! Database repository layer
//!
//! Store contracts are async traits so the services and the auth gateway do
//! not depend on a particular backend. `UserRepository` / `StudyRepository`
//! talk to PostgreSQL; `MemoryStore` keeps everything in process.

pub mod memory;
pub mod study_repo;
pub mod user_repo;

pub use memory::MemoryStore;
pub use study_repo::StudyRepository;
pub use user_repo::UserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    card::{Card, CardUpsert, CreateCardRequest, UpdateCardRequest},
    study_set::{CreateSetRequest, StudySet, UpdateSetRequest},
    user::{NewUser, TokenMaterial, User},
};

/// Column guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    TokenId,
}

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    Conflict(UniqueField),

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Map a unique violation on a known constraint, pass everything else through
    pub(crate) fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some("users_token_id_key") => return StoreError::Conflict(UniqueField::TokenId),
                    Some("users_email_key") => return StoreError::Conflict(UniqueField::Email),
                    _ => {}
                }
            }
        }
        StoreError::Database(e)
    }
}

/// Persistence contract for principals and their token material
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// O(1) indexed lookup by public token identifier
    async fn find_by_token_identifier(&self, token_id: &str) -> Result<Option<User>, StoreError>;

    /// Every user holding an opaque token (no identifier) that has not expired at `now`
    async fn find_all_with_unexpired_token(&self, now: DateTime<Utc>)
        -> Result<Vec<User>, StoreError>;

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Atomically overwrite the user's token material and last-login time.
    ///
    /// Fails with `Conflict(TokenId)` if another user holds the identifier.
    async fn save_token(&self, user_id: i64, material: &TokenMaterial)
        -> Result<User, StoreError>;

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError>;

    /// Readiness probe
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Persistence contract for study sets and cards.
///
/// Every operation is scoped by owner id; rows of other users are invisible.
#[async_trait]
pub trait StudyStore: Send + Sync {
    async fn create_set(&self, user_id: i64, req: &CreateSetRequest)
        -> Result<StudySet, StoreError>;

    /// Sets created after `since`, newest first
    async fn list_sets(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StudySet>, StoreError>;

    async fn get_set(&self, user_id: i64, set_id: i64) -> Result<Option<StudySet>, StoreError>;

    async fn update_set(
        &self,
        user_id: i64,
        set_id: i64,
        req: &UpdateSetRequest,
    ) -> Result<Option<StudySet>, StoreError>;

    async fn delete_set(&self, user_id: i64, set_id: i64) -> Result<bool, StoreError>;

    async fn list_cards(&self, user_id: i64, set_id: i64) -> Result<Vec<Card>, StoreError>;

    /// `None` when the target set is not owned by the user
    async fn create_card(&self, user_id: i64, req: &CreateCardRequest)
        -> Result<Option<Card>, StoreError>;

    async fn get_card(&self, user_id: i64, card_id: i64) -> Result<Option<Card>, StoreError>;

    async fn update_card(
        &self,
        user_id: i64,
        card_id: i64,
        req: &UpdateCardRequest,
    ) -> Result<Option<Card>, StoreError>;

    async fn delete_card(&self, user_id: i64, card_id: i64) -> Result<bool, StoreError>;

    /// Apply a batch of creates/updates to one set, all or nothing.
    ///
    /// Entries are pre-validated by the caller. An update naming a card outside
    /// the set fails the whole batch with `BatchError::CardNotFound`.
    async fn upsert_cards(&self, set_id: i64, cards: &[CardUpsert])
        -> Result<Vec<Card>, BatchError>;
}

/// Batch upsert failures
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Card with ID {0} not found")]
    CardNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for BatchError {
    fn from(e: sqlx::Error) -> Self {
        BatchError::Store(StoreError::Database(e))
    }
}
