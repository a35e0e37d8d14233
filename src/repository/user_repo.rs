//! User repository (数据库访问层)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{PrincipalStore, StoreError};
use crate::models::user::{NewUser, TokenMaterial, User};

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for UserRepository {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据令牌标识查找用户（唯一索引）
    async fn find_by_token_identifier(&self, token_id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE token_id = $1")
            .bind(token_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 查找持有未过期不透明令牌的用户
    async fn find_all_with_unexpired_token(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE token_hash IS NOT NULL
              AND token_id IS NULL
              AND token_expires > $1
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// 创建用户
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    /// 覆盖令牌（单行原子更新）
    async fn save_token(
        &self,
        user_id: i64,
        material: &TokenMaterial,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                token_id = $2,
                token_hash = $3,
                token_expires = $4,
                last_login = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&material.token_id)
        .bind(&material.token_hash)
        .bind(material.expires_at)
        .bind(material.issued_at)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?
        .ok_or(StoreError::NotFound)
    }

    /// 列出所有用户
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        crate::db::record_pool_metrics(&self.db);
        Ok(())
    }
}
