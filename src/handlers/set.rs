//! 学习集的 HTTP 处理器

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    auth::gateway::CurrentUser,
    error::AppError,
    middleware::AppState,
    models::{
        study_set::{CreateSetRequest, ListSetsQuery, SetResponse, UpdateSetRequest},
        user::UserResponse,
    },
};

/// 创建学习集
pub async fn create_set(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateSetRequest>,
) -> Result<Json<Value>, AppError> {
    let set = state.study_service.create_set(&user, req).await?;
    let owner = UserResponse::from(user);

    Ok(Json(json!({
        "success": true,
        "set": SetResponse::new(set, owner),
    })))
}

/// 列出学习集（分页）
pub async fn list_sets(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListSetsQuery>,
) -> Result<Json<Value>, AppError> {
    let (sets, pagination) = state.study_service.list_sets(&user, &query).await?;
    let owner = UserResponse::from(user);

    let sets: Vec<SetResponse> = sets
        .into_iter()
        .map(|set| SetResponse::new(set, owner.clone()))
        .collect();

    Ok(Json(json!({
        "success": true,
        "sets": sets,
        "pagination": pagination,
    })))
}

/// 获取学习集
pub async fn get_set(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(set_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let set = state.study_service.get_set(&user, set_id).await?;

    Ok(Json(json!({
        "success": true,
        "set": SetResponse::new(set, UserResponse::from(user)),
    })))
}

/// 更新学习集
pub async fn update_set(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(set_id): Path<i64>,
    Json(req): Json<UpdateSetRequest>,
) -> Result<Json<Value>, AppError> {
    let set = state.study_service.update_set(&user, set_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "set": SetResponse::new(set, UserResponse::from(user)),
    })))
}

/// 删除学习集（卡片级联删除）
pub async fn delete_set(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(set_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.study_service.delete_set(&user, set_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Set deleted successfully",
    })))
}
