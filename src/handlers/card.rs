//! 卡片的 HTTP 处理器

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    auth::gateway::CurrentUser,
    error::AppError,
    middleware::AppState,
    models::card::{BatchCardsRequest, Card, CardResponse, CreateCardRequest, UpdateCardRequest},
};

fn to_responses(cards: Vec<Card>) -> Vec<CardResponse> {
    cards.into_iter().map(CardResponse::from).collect()
}

/// 列出学习集中的卡片
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(set_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let cards = state.study_service.list_cards(&user, set_id).await?;

    Ok(Json(json!({
        "success": true,
        "cards": to_responses(cards),
    })))
}

/// 创建卡片
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateCardRequest>,
) -> Result<Json<Value>, AppError> {
    let card = state.study_service.create_card(&user, req).await?;

    Ok(Json(json!({
        "success": true,
        "card": CardResponse::from(card),
    })))
}

/// 获取卡片
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(card_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let card = state.study_service.get_card(&user, card_id).await?;

    Ok(Json(json!({
        "success": true,
        "card": CardResponse::from(card),
    })))
}

/// 更新卡片
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(card_id): Path<i64>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<Value>, AppError> {
    let card = state.study_service.update_card(&user, card_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "card": CardResponse::from(card),
    })))
}

/// 删除卡片
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(card_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.study_service.delete_card(&user, card_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Card deleted successfully",
    })))
}

/// 批量创建/更新卡片
pub async fn upsert_cards(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(set_id): Path<i64>,
    Json(req): Json<BatchCardsRequest>,
) -> Result<Json<Value>, AppError> {
    let cards = state.study_service.upsert_cards(&user, set_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "cards": to_responses(cards),
    })))
}
