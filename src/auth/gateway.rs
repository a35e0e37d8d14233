//! 认证网关中间件
//!
//! Every request under a gateway either matches an excluded path or must carry
//! `Authorization: Token <credential>`. The resolved principal is attached to
//! the request extensions and handed to handlers through `CurrentUser`.

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::{
    auth::{
        excluded::ExcludedPaths,
        resolver::{AuthError, TokenResolver},
        token::TokenScheme,
    },
    error::AppError,
    models::user::User,
};

/// Required scheme prefix of the `Authorization` header
pub const TOKEN_PREFIX: &str = "Token ";

/// Read the `Authorization` header. A present but non-visible-ASCII value is malformed.
pub fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::Malformed))
        .transpose()
}

/// Strip the `Token ` prefix from an `Authorization` header value
pub fn extract_token(header: Option<&str>) -> Result<&str, AuthError> {
    let credential = header
        .and_then(|value| value.strip_prefix(TOKEN_PREFIX))
        .ok_or(AuthError::Missing)?
        .trim();

    if credential.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(credential)
}

/// Verifies `Authorization` header values with one resolver. Read-only.
pub struct Authenticator {
    resolver: Arc<dyn TokenResolver>,
}

impl Authenticator {
    pub fn new(resolver: Arc<dyn TokenResolver>) -> Self {
        Self { resolver }
    }

    pub fn scheme(&self) -> TokenScheme {
        self.resolver.scheme()
    }

    pub async fn authenticate(&self, header: Option<&str>) -> Result<User, AuthError> {
        let result = match extract_token(header) {
            Ok(credential) => self.resolver.resolve(credential).await,
            Err(e) => Err(e),
        };

        self.record(&result);
        result
    }

    /// Authenticate straight from request headers
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<User, AuthError> {
        match authorization_header(headers) {
            Ok(header) => self.authenticate(header).await,
            Err(e) => {
                let result = Err(e);
                self.record(&result);
                result
            }
        }
    }

    fn record(&self, result: &Result<User, AuthError>) {
        let scheme = self.resolver.scheme().as_str();

        let outcome = match result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::counter!("auth_attempts_total", "scheme" => scheme, "outcome" => outcome)
            .increment(1);

        match result {
            Ok(user) => tracing::debug!(user_id = user.id, scheme, "Authenticated"),
            Err(AuthError::Backend(detail)) => {
                tracing::error!(scheme, error = %detail, "Authentication backend failure")
            }
            Err(e) => tracing::info!(scheme, outcome = e.outcome(), "Authentication rejected"),
        }
    }
}

/// Middleware state for one gateway
#[derive(Clone)]
pub struct AuthGateway {
    pub excluded: ExcludedPaths,
    pub authenticator: Arc<Authenticator>,
}

impl AuthGateway {
    pub fn new(excluded: ExcludedPaths, authenticator: Arc<Authenticator>) -> Self {
        Self {
            excluded,
            authenticator,
        }
    }
}

/// 认证中间件 - 排除路径直接放行
pub async fn auth_gateway(
    State(gateway): State<AuthGateway>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // nest 会裁剪 uri，优先使用原始路径
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    if gateway.excluded.is_excluded(&path) {
        return Ok(next.run(req).await);
    }

    let user = gateway
        .authenticator
        .authenticate_headers(req.headers())
        .await?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Principal resolved by the gateway
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Auth(AuthError::Missing))
    }
}
