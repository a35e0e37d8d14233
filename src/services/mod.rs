//! Business logic services layer

pub mod auth_service;
pub mod study_service;

pub use auth_service::AuthService;
pub use study_service::StudyService;
