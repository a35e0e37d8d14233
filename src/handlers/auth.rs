//! 认证相关的 HTTP 处理器

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::{
    auth::{
        gateway::{AuthGateway, CurrentUser},
        token::TokenScheme,
    },
    error::AppError,
    middleware::AppState,
    models::{
        auth::{AuthResponse, CheckAuthResponse, LoginRequest, RegisterRequest},
        user::UserResponse,
    },
};

/// 注册
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service.register(req, TokenScheme::Split).await?;
    Ok(Json(response))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service.login(req, TokenScheme::Split).await?;
    Ok(Json(response))
}

/// 校验 Authorization 头中的令牌
pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CheckAuthResponse>, AppError> {
    check_with(&state.api_gateway, &headers).await
}

/// 旧版注册（签发不透明令牌）
pub async fn legacy_register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service.register(req, TokenScheme::Opaque).await?;
    Ok(Json(response))
}

/// 旧版登录（签发不透明令牌）
pub async fn legacy_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service.login(req, TokenScheme::Opaque).await?;
    Ok(Json(response))
}

/// 旧版令牌校验
pub async fn legacy_check_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CheckAuthResponse>, AppError> {
    let gateway = state
        .legacy_gateway
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;
    check_with(gateway, &headers).await
}

/// 当前用户（受旧版网关保护）
pub async fn legacy_me(CurrentUser(user): CurrentUser) -> Json<CheckAuthResponse> {
    Json(CheckAuthResponse {
        success: true,
        user: UserResponse::from(user),
    })
}

async fn check_with(
    gateway: &AuthGateway,
    headers: &HeaderMap,
) -> Result<Json<CheckAuthResponse>, AppError> {
    let user = gateway.authenticator.authenticate_headers(headers).await?;

    Ok(Json(CheckAuthResponse {
        success: true,
        user: UserResponse::from(user),
    }))
}
