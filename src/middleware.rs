//! HTTP 中间件与应用状态
//! 请求追踪、服务装配

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{
        clock::Clock,
        excluded::ExcludedPaths,
        gateway::{AuthGateway, Authenticator},
        hasher::CredentialHasher,
        resolver::{IndexedResolver, ScanResolver},
        token::TokenIssuer,
    },
    config::AppConfig,
    error::AppError,
    repository::{PrincipalStore, StudyStore},
    services::{AuthService, StudyService},
};

/// 应用状态
///
/// 存储与服务均以 Arc 共享，Clone 只拷贝指针
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub principals: Arc<dyn PrincipalStore>,
    pub auth_service: Arc<AuthService>,
    pub study_service: Arc<StudyService>,
    /// 主网关（identifier:secret 令牌）
    pub api_gateway: AuthGateway,
    /// 旧版网关（不透明令牌），未启用时为 None
    pub legacy_gateway: Option<AuthGateway>,
}

impl AppState {
    /// 按配置装配哈希器、签发器与两个网关
    pub fn build(
        config: AppConfig,
        principals: Arc<dyn PrincipalStore>,
        study: Arc<dyn StudyStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let security = &config.security;
        let password_hasher = CredentialHasher::new(security.password_algorithm()?)?;
        let token_hasher = CredentialHasher::new(security.token_algorithm()?)?;

        let issuer = Arc::new(TokenIssuer::new(
            principals.clone(),
            token_hasher.clone(),
            clock.clone(),
            security.token_ttl(),
            security.token_issue_attempts,
        ));

        let api_authenticator = Arc::new(Authenticator::new(Arc::new(IndexedResolver::new(
            principals.clone(),
            token_hasher.clone(),
            clock.clone(),
        ))));
        let api_gateway = AuthGateway::new(ExcludedPaths::api_defaults(), api_authenticator);

        let legacy_gateway = if security.legacy_gateway_enabled {
            let authenticator = Arc::new(Authenticator::new(Arc::new(ScanResolver::new(
                principals.clone(),
                token_hasher,
                clock,
            ))));
            Some(AuthGateway::new(ExcludedPaths::legacy_defaults(), authenticator))
        } else {
            None
        };

        let auth_service = Arc::new(AuthService::new(
            principals.clone(),
            password_hasher,
            issuer,
            security.password_min_length,
        ));

        Ok(Self {
            config: Arc::new(config),
            principals,
            auth_service,
            study_service: Arc::new(StudyService::new(study)),
            api_gateway,
            legacy_gateway,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    // 只记录路径，查询参数可能含敏感信息
    let path = req.uri().path().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            408 => "408",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
