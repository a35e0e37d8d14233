//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    auth::{hasher::HashError, resolver::AuthError},
    repository::{BatchError, StoreError, UniqueField},
};

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 登录凭据错误（邮箱不存在与密码错误不区分）
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::Malformed) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::Conflict(UniqueField::Email)) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Conflict(UniqueField::TokenId))
            | AppError::Store(StoreError::Database(_))
            | AppError::Hash(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Auth(AuthError::Missing) => "Token not provided".to_string(),
            AppError::Auth(AuthError::Malformed) => "Invalid token format".to_string(),
            // 不区分无效与过期，避免泄露令牌状态
            AppError::Auth(AuthError::Invalid) | AppError::Auth(AuthError::Expired) => {
                "Invalid or expired token".to_string()
            }
            AppError::Unauthorized => "Invalid credentials".to_string(),
            AppError::Store(StoreError::Conflict(UniqueField::Email)) => {
                "Email already exists".to_string()
            }
            AppError::Store(StoreError::Conflict(UniqueField::TokenId)) => {
                "Internal server error".to_string()
            }
            AppError::Store(StoreError::NotFound) => "Resource not found".to_string(),
            AppError::NotFound(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(errors) => validation_message(errors),
            AppError::Auth(AuthError::Backend(_))
            | AppError::Store(StoreError::Database(_))
            | AppError::Hash(_)
            | AppError::Config(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 取第一个字段错误作为提示
fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .next()
        .map(|(field, errs)| {
            let detail = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "is invalid".to_string());
            format!("{} {}", field, detail)
        })
        .unwrap_or_else(|| "Invalid request".to_string())
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let error_response = ErrorResponse {
            success: false,
            error: self.user_message(),
            request_id,
        };

        // 记录错误日志：服务端错误用 error，客户端错误用 warn
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Application error"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                message = %error_response.error,
                request_id = %error_response.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

impl From<BatchError> for AppError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::CardNotFound(id) => {
                AppError::NotFound(format!("Card with ID {} not found", id))
            }
            BatchError::Store(e) => AppError::Store(e),
        }
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
