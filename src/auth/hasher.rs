//! Credential hashing and verification (passwords and token secrets)
//!
//! Records are PHC strings, so every record carries its own algorithm tag,
//! cost parameters and salt. Verification accepts any supported algorithm and
//! always uses the parameters embedded in the record.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use pbkdf2::Pbkdf2;
use std::sync::Arc;
use thiserror::Error;

/// Secret behind the placeholder record used for unknown principals
const DUMMY_SECRET: &[u8] = b"flashdeck-placeholder-credential";

/// Hashing backend failures
#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hash parameters: {0}")]
    Params(String),

    #[error("failed to hash secret: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Task(String),
}

/// Supported hashing algorithms and their work factors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Argon2id {
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
    Pbkdf2Sha256 {
        rounds: u32,
    },
}

impl HashAlgorithm {
    /// Build from the flat configuration values
    pub fn from_settings(
        name: &str,
        iterations: u32,
        memory_kib: u32,
        parallelism: u32,
    ) -> Result<Self, HashError> {
        if iterations == 0 {
            return Err(HashError::Params("iterations must be > 0".to_string()));
        }

        match name.to_lowercase().as_str() {
            "argon2id" => Ok(HashAlgorithm::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            }),
            "pbkdf2-sha256" => Ok(HashAlgorithm::Pbkdf2Sha256 { rounds: iterations }),
            other => Err(HashError::Params(format!(
                "unknown hash algorithm: {}. Must be one of: argon2id, pbkdf2-sha256",
                other
            ))),
        }
    }
}

impl Default for HashAlgorithm {
    /// OWASP recommended argon2id parameters: m=64MiB, t=3, p=4
    fn default() -> Self {
        HashAlgorithm::Argon2id {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// One-way salted hasher with a deployment-time work factor
#[derive(Clone)]
pub struct CredentialHasher {
    algorithm: HashAlgorithm,
    argon2: Argon2<'static>,
    /// Placeholder record, hashed on first use with this hasher's parameters
    dummy: Arc<OnceCell<String>>,
}

impl CredentialHasher {
    pub fn new(algorithm: HashAlgorithm) -> Result<Self, HashError> {
        let argon2 = match algorithm {
            HashAlgorithm::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                let params = Params::new(memory_kib, iterations, parallelism, None)
                    .map_err(|e| HashError::Params(e.to_string()))?;
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            }
            HashAlgorithm::Pbkdf2Sha256 { .. } => Argon2::default(),
        };

        Ok(Self {
            algorithm,
            argon2,
            dummy: Arc::new(OnceCell::new()),
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &[u8]) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        let record = match self.algorithm {
            HashAlgorithm::Argon2id { .. } => self
                .argon2
                .hash_password(secret, &salt)
                .map_err(|e| HashError::Hash(e.to_string()))?
                .to_string(),
            HashAlgorithm::Pbkdf2Sha256 { rounds } => {
                let params = pbkdf2::Params {
                    rounds,
                    output_length: 32,
                };
                Pbkdf2
                    .hash_password_customized(secret, None, None, params, &salt)
                    .map_err(|e| HashError::Hash(e.to_string()))?
                    .to_string()
            }
        };

        Ok(record)
    }

    /// Verify a secret against a stored record.
    ///
    /// Malformed or unrecognised records fail closed.
    pub fn verify(&self, secret: &[u8], record: &str) -> bool {
        let parsed = match PasswordHash::new(record) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Unrecognized hash record: {}", e);
                return false;
            }
        };

        let verifiers: [&dyn PasswordVerifier; 2] = [&self.argon2, &Pbkdf2];
        parsed.verify_password(&verifiers, secret).is_ok()
    }

    /// Hash on the blocking pool
    pub async fn spawn_hash(&self, secret: String) -> Result<String, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(secret.as_bytes()))
            .await
            .map_err(|e| HashError::Task(e.to_string()))?
    }

    /// Verify on the blocking pool
    pub async fn spawn_verify(&self, secret: String, record: String) -> Result<bool, HashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(secret.as_bytes(), &record))
            .await
            .map_err(|e| HashError::Task(e.to_string()))
    }

    /// Run one verification against the placeholder record and discard the result.
    ///
    /// Lookups that find no principal call this so they cost the same as a
    /// secret mismatch.
    pub async fn spawn_verify_placeholder(&self, secret: String) {
        let hasher = self.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            if let Some(record) = hasher.placeholder_record() {
                let _ = hasher.verify(secret.as_bytes(), record);
            }
        })
        .await;

        if let Err(e) = outcome {
            tracing::warn!("Placeholder verification task failed: {}", e);
        }
    }

    #[cfg(test)]
    pub(crate) fn placeholder_built(&self) -> bool {
        self.dummy.get().is_some()
    }

    fn placeholder_record(&self) -> Option<&str> {
        self.dummy
            .get_or_try_init(|| self.hash(DUMMY_SECRET))
            .map(String::as_str)
            .map_err(|e| tracing::warn!("Failed to build placeholder record: {}", e))
            .ok()
    }
}
