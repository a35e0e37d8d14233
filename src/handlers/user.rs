//! 用户公开列表的 HTTP 处理器

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{error::AppError, middleware::AppState, models::user::PublicUser};

const LIST_LIMIT: i64 = 1000;

/// 列出用户（邮箱与名称）
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = state.principals.list(LIST_LIMIT, 0).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

/// 按邮箱获取用户
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .principals
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(PublicUser::from(user)))
}
