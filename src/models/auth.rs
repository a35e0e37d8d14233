//! Authentication-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserResponse;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Email must be in the format \"email@domain.com\""),
        length(max = 254, message = "Email is too long")
    )]
    pub email: String,
    pub password: String,
    #[validate(length(max = 255, message = "Name is too long"))]
    pub name: Option<String>,
}

/// Login / registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
    pub expires: DateTime<Utc>,
}

/// Token check response
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAuthResponse {
    pub success: bool,
    pub user: UserResponse,
}
