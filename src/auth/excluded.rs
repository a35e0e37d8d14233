//! Paths that bypass authentication

use once_cell::sync::Lazy;
use regex::RegexSet;

/// Public routes under the primary gateway
pub const API_EXCLUDED_PATHS: &[&str] = &[
    r"^/api/login/$",
    r"^/api/register/$",
    r"^/api/check-auth/$",
    r"^/api/ping/?$",
    r"^/api/admin/",
    r"^/admin/",
    r"^/api/users/",
];

/// Public routes under the legacy gateway
pub const LEGACY_EXCLUDED_PATHS: &[&str] = &[
    r"^/legacy/login/$",
    r"^/legacy/register/$",
    r"^/legacy/check-auth/$",
];

static API_DEFAULT: Lazy<ExcludedPaths> = Lazy::new(|| {
    ExcludedPaths::new(API_EXCLUDED_PATHS).unwrap_or_else(|_| ExcludedPaths::none())
});

static LEGACY_DEFAULT: Lazy<ExcludedPaths> = Lazy::new(|| {
    ExcludedPaths::new(LEGACY_EXCLUDED_PATHS).unwrap_or_else(|_| ExcludedPaths::none())
});

/// Anchored path patterns compiled into one `RegexSet`
#[derive(Debug, Clone)]
pub struct ExcludedPaths {
    set: RegexSet,
}

impl ExcludedPaths {
    /// Compile patterns. A pattern without a leading `^` is anchored at the
    /// start, so `/api/login/` never matches inside a longer path.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let anchored: Vec<String> = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                if p.starts_with('^') {
                    p.to_string()
                } else {
                    format!("^{}", p)
                }
            })
            .collect();

        Ok(Self {
            set: RegexSet::new(anchored)?,
        })
    }

    /// Matches nothing
    pub fn none() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn api_defaults() -> Self {
        API_DEFAULT.clone()
    }

    pub fn legacy_defaults() -> Self {
        LEGACY_DEFAULT.clone()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
