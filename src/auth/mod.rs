//! Authentication module
//!
//! Credential hashing, token issuance and the request gateways.

pub mod clock;
pub mod excluded;
pub mod gateway;
pub mod hasher;
pub mod resolver;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use excluded::ExcludedPaths;
pub use gateway::{auth_gateway, extract_token, AuthGateway, Authenticator, CurrentUser};
pub use hasher::{CredentialHasher, HashAlgorithm, HashError};
pub use resolver::{AuthError, IndexedResolver, ScanResolver, TokenResolver};
pub use token::{IssuedToken, TokenIssuer, TokenScheme};
