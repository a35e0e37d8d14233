//! 测试公共模块
//! 提供测试辅助函数和测试工具

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use flashdeck::{
    auth::clock::ManualClock,
    config::{
        AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig, StorageBackend,
    },
    middleware::AppState,
    repository::MemoryStore,
    routes,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "password123";

/// 创建测试配置（内存存储，低成本哈希）
pub fn create_test_config(legacy_gateway_enabled: bool) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            backend: StorageBackend::Memory,
            url: None,
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            token_ttl_secs: 172800,
            token_issue_attempts: 3,
            token_hash_algorithm: "pbkdf2-sha256".to_string(),
            token_hash_iterations: 1000,
            password_hash_algorithm: "pbkdf2-sha256".to_string(),
            password_hash_iterations: 1000,
            argon2_memory_kib: 1024,
            argon2_parallelism: 1,
            password_min_length: 8,
            legacy_gateway_enabled,
        },
    }
}

/// 测试应用：路由 + 内存存储 + 可控时钟
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(create_test_config(false))
    }

    pub fn with_legacy() -> Self {
        Self::with_config(create_test_config(true))
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let state = Arc::new(
            AppState::build(config, store.clone(), store.clone(), clock.clone())
                .expect("Failed to build app state"),
        );
        let router = routes::create_router(state.clone());

        Self {
            router,
            state,
            store,
            clock,
        }
    }

    /// 发送请求，返回状态码与 JSON 响应体
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let auth = token.map(|t| format!("Token {}", t));
        self.request(Method::GET, uri, auth.as_deref(), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let auth = token.map(|t| format!("Token {}", t));
        self.request(Method::POST, uri, auth.as_deref(), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let auth = token.map(|t| format!("Token {}", t));
        self.request(Method::DELETE, uri, auth.as_deref(), None)
            .await
    }

    /// 注册用户并返回令牌
    pub async fn register(&self, email: &str) -> String {
        self.register_at("/api/register/", email).await
    }

    pub async fn register_at(&self, uri: &str, email: &str) -> String {
        let (status, body) = self
            .post(
                uri,
                None,
                json!({ "email": email, "password": TEST_PASSWORD, "name": "Test User" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// 登录并返回令牌
    pub async fn login_at(&self, uri: &str, email: &str) -> String {
        let (status, body) = self
            .post(uri, None, json!({ "email": email, "password": TEST_PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str) -> String {
        self.login_at("/api/login/", email).await
    }
}
