//! 认证服务：注册、登录

use crate::{
    auth::{
        hasher::CredentialHasher,
        token::{IssuedToken, TokenIssuer, TokenScheme},
    },
    error::AppError,
    models::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        user::{NewUser, UserResponse},
    },
    repository::PrincipalStore,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use validator::Validate;

pub struct AuthService {
    principals: Arc<dyn PrincipalStore>,
    password_hasher: CredentialHasher,
    issuer: Arc<TokenIssuer>,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        password_hasher: CredentialHasher,
        issuer: Arc<TokenIssuer>,
        password_min_length: usize,
    ) -> Self {
        Self {
            principals,
            password_hasher,
            issuer,
            password_min_length,
        }
    }

    /// 注册新用户并签发令牌
    pub async fn register(
        &self,
        req: RegisterRequest,
        scheme: TokenScheme,
    ) -> Result<AuthResponse, AppError> {
        req.validate()?;
        self.validate_password_policy(&req.password)?;

        let email = req.email.trim().to_string();
        if self.principals.find_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("Email already exists".to_string()));
        }

        let password_hash = self.password_hasher.spawn_hash(req.password).await?;

        // 并发注册由唯一约束兜底，映射为同一错误
        let user = self
            .principals
            .create(NewUser {
                email,
                name: req.name,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, scheme = scheme.as_str(), "User registered");

        let issued = self.issuer.issue_for(&user, scheme).await?;
        Ok(auth_response(issued))
    }

    /// 用户登录，签发新令牌（旧令牌随之失效）
    pub async fn login(
        &self,
        req: LoginRequest,
        scheme: TokenScheme,
    ) -> Result<AuthResponse, AppError> {
        let Some(user) = self.principals.find_by_email(req.email.trim()).await? else {
            // 未知邮箱同样执行一次哈希校验
            self.password_hasher
                .spawn_verify_placeholder(req.password)
                .await;
            return Err(AppError::Unauthorized);
        };

        let valid = self
            .password_hasher
            .spawn_verify(req.password, user.password_hash.clone())
            .await?;

        if !valid {
            tracing::info!(user_id = user.id, "Login rejected: wrong password");
            return Err(AppError::Unauthorized);
        }

        let issued = self.issuer.issue_for(&user, scheme).await?;
        tracing::info!(user_id = user.id, scheme = scheme.as_str(), "User logged in");

        Ok(auth_response(issued))
    }

    /// 验证密码策略：长度不小于下限，且不能全为空白
    pub fn validate_password_policy(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.password_min_length {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters long",
                self.password_min_length
            )));
        }

        if password.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Password must not be blank".to_string(),
            ));
        }

        Ok(())
    }
}

fn auth_response(issued: IssuedToken) -> AuthResponse {
    AuthResponse {
        success: true,
        token: issued.token.expose_secret().clone(),
        user: UserResponse::from(issued.user),
        expires: issued.expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{clock::ManualClock, hasher::HashAlgorithm},
        repository::MemoryStore,
    };
    use chrono::Duration;

    fn service() -> AuthService {
        let store = Arc::new(MemoryStore::new());
        let hasher = CredentialHasher::new(HashAlgorithm::Pbkdf2Sha256 { rounds: 1000 }).unwrap();
        let issuer = Arc::new(TokenIssuer::new(
            store.clone(),
            hasher.clone(),
            Arc::new(ManualClock::default()),
            Duration::days(2),
            3,
        ));
        AuthService::new(store, hasher, issuer, 8)
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: Some("Test".to_string()),
        }
    }

    #[test]
    fn test_password_policy() {
        let service = service();
        assert!(service.validate_password_policy("short").is_err());
        assert!(service.validate_password_policy("          ").is_err());
        assert!(service.validate_password_policy("long enough").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let registered = service
            .register(register_request("a@example.com", "password123"), TokenScheme::Split)
            .await
            .unwrap();
        assert!(registered.success);
        assert!(registered.token.contains(':'));

        let logged_in = service
            .login(
                LoginRequest {
                    email: "a@example.com".to_string(),
                    password: "password123".to_string(),
                },
                TokenScheme::Split,
            )
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
        assert_ne!(logged_in.token, registered.token);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service();
        service
            .register(register_request("a@example.com", "password123"), TokenScheme::Split)
            .await
            .unwrap();

        let err = service
            .register(register_request("a@example.com", "password456"), TokenScheme::Split)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email already exists");
    }

    #[tokio::test]
    async fn test_login_failures_indistinguishable() {
        let service = service();
        service
            .register(register_request("a@example.com", "password123"), TokenScheme::Split)
            .await
            .unwrap();

        let wrong_password = service
            .login(
                LoginRequest {
                    email: "a@example.com".to_string(),
                    password: "wrong-password".to_string(),
                },
                TokenScheme::Split,
            )
            .await
            .unwrap_err();
        let unknown_email = service
            .login(
                LoginRequest {
                    email: "b@example.com".to_string(),
                    password: "password123".to_string(),
                },
                TokenScheme::Split,
            )
            .await
            .unwrap_err();

        assert_eq!(wrong_password.code(), 401);
        assert_eq!(wrong_password.user_message(), unknown_email.user_message());
    }

    #[tokio::test]
    async fn test_unknown_email_still_runs_password_verification() {
        let service = service();
        assert!(!service.password_hasher.placeholder_built());

        let err = service
            .login(
                LoginRequest {
                    email: "nobody@example.com".to_string(),
                    password: "password123".to_string(),
                },
                TokenScheme::Split,
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), 401);
        assert!(service.password_hasher.placeholder_built());
    }

    #[tokio::test]
    async fn test_register_opaque() {
        let service = service();
        let registered = service
            .register(register_request("a@example.com", "password123"), TokenScheme::Opaque)
            .await
            .unwrap();
        assert_eq!(registered.token.len(), 64);
        assert!(!registered.token.contains(':'));
    }
}
