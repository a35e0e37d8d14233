//! Study set models

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserResponse;

/// Study set owned by a single user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudySet {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub term_lang: Option<String>,
    pub definition_lang: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Create set request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSetRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub term_lang: Option<String>,
    #[validate(length(max = 50))]
    pub definition_lang: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial set update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSetRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub term_lang: Option<String>,
    #[validate(length(max = 50))]
    pub definition_lang: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateSetRequest {
    pub fn apply_to(&self, set: &mut StudySet) {
        if let Some(title) = &self.title {
            set.title = title.clone();
        }
        if let Some(description) = &self.description {
            set.description = Some(description.clone());
        }
        if let Some(term_lang) = &self.term_lang {
            set.term_lang = Some(term_lang.clone());
        }
        if let Some(definition_lang) = &self.definition_lang {
            set.definition_lang = Some(definition_lang.clone());
        }
        if let Some(is_public) = self.is_public {
            set.is_public = is_public;
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Query for `/get-sets/`
#[derive(Debug, Clone, Deserialize)]
pub struct ListSetsQuery {
    pub since: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ListSetsQuery {
    fn default() -> Self {
        Self {
            since: None,
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ListSetsQuery {
    /// Lower bound on `created_at`; defaults to 1999-01-01T00:00:00Z.
    ///
    /// Accepts RFC 3339 or a naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC).
    pub fn since(&self) -> Result<DateTime<Utc>, String> {
        let Some(raw) = self.since.as_deref() else {
            return Ok(default_since());
        };

        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Ok(at.with_timezone(&Utc));
        }

        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| format!("Invalid since timestamp: {}", raw))
    }

    pub fn validate_bounds(&self) -> Result<(), String> {
        if self.skip < 0 {
            return Err("skip must be >= 0".to_string());
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(format!("limit must be between 1 and {}", MAX_PAGE_LIMIT));
        }
        Ok(())
    }
}

fn default_since() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Set response with the owner embedded
#[derive(Debug, Serialize, Deserialize)]
pub struct SetResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub term_lang: Option<String>,
    pub definition_lang: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_public: bool,
    pub user: UserResponse,
}

impl SetResponse {
    pub fn new(set: StudySet, owner: UserResponse) -> Self {
        Self {
            id: set.id,
            title: set.title,
            description: set.description,
            term_lang: set.term_lang,
            definition_lang: set.definition_lang,
            created_at: set.created_at,
            is_public: set.is_public,
            user: owner,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
    pub count: usize,
    pub has_more: bool,
}
