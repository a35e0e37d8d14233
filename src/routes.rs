//! 路由注册
//! 创建所有 API 路由并挂载认证网关

use axum::{
    http::{header, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

use crate::{auth::gateway::auth_gateway, handlers, middleware::AppState};

/// 请求体上限（批量卡片请求留足余量）
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查），不经过任何网关
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 主网关：identifier:secret 令牌，排除路径由 ExcludedPaths 决定
    let api_routes = Router::new()
        // 账户（排除路径）
        .route("/api/register/", post(handlers::auth::register))
        .route("/api/login/", post(handlers::auth::login))
        .route("/api/check-auth/", post(handlers::auth::check_auth))
        .route("/api/ping", get(handlers::health::ping))
        .route("/api/ping/", get(handlers::health::ping))
        .route("/api/users/", get(handlers::user::list_users))
        .route("/api/users/{email}", get(handlers::user::get_user))

        // 学习集
        .route("/api/create-set/", post(handlers::set::create_set))
        .route("/api/get-sets/", get(handlers::set::list_sets))
        .route("/api/get-set/{id}/", get(handlers::set::get_set))
        .route("/api/update-set/{id}/", post(handlers::set::update_set))
        .route("/api/delete-set/{id}/", delete(handlers::set::delete_set))

        // 卡片
        .route("/api/get-cards/{set_id}/", get(handlers::card::list_cards))
        .route("/api/create-card/", post(handlers::card::create_card))
        .route("/api/get-card/{id}/", get(handlers::card::get_card))
        .route("/api/update-card/{id}/", post(handlers::card::update_card))
        .route("/api/delete-card/{id}/", delete(handlers::card::delete_card))
        .route(
            "/api/create-update-cards/{set_id}/",
            post(handlers::card::upsert_cards),
        )
        .route_layer(from_fn_with_state(state.api_gateway.clone(), auth_gateway));

    let mut app = Router::new().merge(public_routes).merge(api_routes);

    // 旧版网关：不透明令牌，仅在配置启用时挂载
    if let Some(legacy_gateway) = state.legacy_gateway.clone() {
        let legacy_routes = Router::new()
            .route("/legacy/register/", post(handlers::auth::legacy_register))
            .route("/legacy/login/", post(handlers::auth::legacy_login))
            .route("/legacy/check-auth/", post(handlers::auth::legacy_check_auth))
            .route("/legacy/me/", get(handlers::auth::legacy_me))
            .route_layer(from_fn_with_state(legacy_gateway, auth_gateway));

        app = app.merge(legacy_routes);
        tracing::info!("Legacy opaque-token gateway enabled");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    app.layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(state.config.server.request_timeout_secs),
        ))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
