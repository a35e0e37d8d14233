//! Study set / card repository (数据库访问层)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{BatchError, StoreError, StudyStore};
use crate::models::{
    card::{Card, CardUpsert, CreateCardRequest, UpdateCardRequest},
    study_set::{CreateSetRequest, StudySet, UpdateSetRequest},
};

pub struct StudyRepository {
    db: PgPool,
}

impl StudyRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudyStore for StudyRepository {
    async fn create_set(
        &self,
        user_id: i64,
        req: &CreateSetRequest,
    ) -> Result<StudySet, StoreError> {
        let set = sqlx::query_as::<_, StudySet>(
            r#"
            INSERT INTO study_sets (user_id, title, description, term_lang, definition_lang, is_public)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.term_lang)
        .bind(&req.definition_lang)
        .bind(req.is_public)
        .fetch_one(&self.db)
        .await?;

        Ok(set)
    }

    async fn list_sets(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StudySet>, StoreError> {
        let sets = sqlx::query_as::<_, StudySet>(
            r#"
            SELECT * FROM study_sets
            WHERE user_id = $1 AND created_at > $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(sets)
    }

    async fn get_set(&self, user_id: i64, set_id: i64) -> Result<Option<StudySet>, StoreError> {
        let set = sqlx::query_as::<_, StudySet>(
            "SELECT * FROM study_sets WHERE id = $1 AND user_id = $2",
        )
        .bind(set_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(set)
    }

    async fn update_set(
        &self,
        user_id: i64,
        set_id: i64,
        req: &UpdateSetRequest,
    ) -> Result<Option<StudySet>, StoreError> {
        let set = sqlx::query_as::<_, StudySet>(
            r#"
            UPDATE study_sets
            SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                term_lang = COALESCE($5, term_lang),
                definition_lang = COALESCE($6, definition_lang),
                is_public = COALESCE($7, is_public)
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(set_id)
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.term_lang)
        .bind(&req.definition_lang)
        .bind(req.is_public)
        .fetch_optional(&self.db)
        .await?;

        Ok(set)
    }

    async fn delete_set(&self, user_id: i64, set_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM study_sets WHERE id = $1 AND user_id = $2")
            .bind(set_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_cards(&self, user_id: i64, set_id: i64) -> Result<Vec<Card>, StoreError> {
        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT c.* FROM cards c
            JOIN study_sets s ON s.id = c.set_id
            WHERE c.set_id = $1 AND s.user_id = $2
            ORDER BY c.id
            "#,
        )
        .bind(set_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(cards)
    }

    async fn create_card(
        &self,
        user_id: i64,
        req: &CreateCardRequest,
    ) -> Result<Option<Card>, StoreError> {
        // 仅当集合属于该用户时插入
        let card = sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (set_id, term, definition, image_url, audio_url)
            SELECT s.id, $3, $4, $5, $6
            FROM study_sets s
            WHERE s.id = $1 AND s.user_id = $2
            RETURNING *
            "#,
        )
        .bind(req.set)
        .bind(user_id)
        .bind(&req.term)
        .bind(&req.definition)
        .bind(&req.image_url)
        .bind(&req.audio_url)
        .fetch_optional(&self.db)
        .await?;

        Ok(card)
    }

    async fn get_card(&self, user_id: i64, card_id: i64) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            SELECT c.* FROM cards c
            JOIN study_sets s ON s.id = c.set_id
            WHERE c.id = $1 AND s.user_id = $2
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(card)
    }

    async fn update_card(
        &self,
        user_id: i64,
        card_id: i64,
        req: &UpdateCardRequest,
    ) -> Result<Option<Card>, StoreError> {
        let card = sqlx::query_as::<_, Card>(
            r#"
            UPDATE cards c
            SET
                term = COALESCE($3, c.term),
                definition = COALESCE($4, c.definition)
            FROM study_sets s
            WHERE c.id = $1 AND s.id = c.set_id AND s.user_id = $2
            RETURNING c.*
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(&req.term)
        .bind(&req.definition)
        .fetch_optional(&self.db)
        .await?;

        Ok(card)
    }

    async fn delete_card(&self, user_id: i64, card_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM cards c
            USING study_sets s
            WHERE c.id = $1 AND s.id = c.set_id AND s.user_id = $2
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_cards(
        &self,
        set_id: i64,
        cards: &[CardUpsert],
    ) -> Result<Vec<Card>, BatchError> {
        let mut tx = self.db.begin().await?;
        let mut results = Vec::with_capacity(cards.len());

        for entry in cards {
            let card = match entry.id {
                Some(card_id) => sqlx::query_as::<_, Card>(
                    r#"
                    UPDATE cards
                    SET
                        term = COALESCE($3, term),
                        definition = COALESCE($4, definition),
                        image_url = COALESCE($5, image_url),
                        audio_url = COALESCE($6, audio_url)
                    WHERE id = $1 AND set_id = $2
                    RETURNING *
                    "#,
                )
                .bind(card_id)
                .bind(set_id)
                .bind(&entry.term)
                .bind(&entry.definition)
                .bind(&entry.image_url)
                .bind(&entry.audio_url)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(BatchError::CardNotFound(card_id))?,
                None => sqlx::query_as::<_, Card>(
                    r#"
                    INSERT INTO cards (set_id, term, definition, image_url, audio_url)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(set_id)
                .bind(entry.term.as_deref().unwrap_or_default())
                .bind(entry.definition.as_deref().unwrap_or_default())
                .bind(&entry.image_url)
                .bind(&entry.audio_url)
                .fetch_one(&mut *tx)
                .await?,
            };
            results.push(card);
        }

        // 任一失败时 tx 被 drop，自动回滚
        tx.commit().await?;
        Ok(results)
    }
}
