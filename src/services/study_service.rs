//! 学习集与卡片服务

use crate::{
    error::AppError,
    models::{
        card::{BatchCardsRequest, Card, CreateCardRequest, UpdateCardRequest},
        study_set::{CreateSetRequest, ListSetsQuery, Pagination, StudySet, UpdateSetRequest},
        user::User,
    },
    repository::StudyStore,
};
use std::sync::Arc;
use validator::Validate;

const SET_NOT_FOUND: &str = "Set not found";
const CARD_NOT_FOUND: &str = "Card not found";

pub struct StudyService {
    store: Arc<dyn StudyStore>,
}

impl StudyService {
    pub fn new(store: Arc<dyn StudyStore>) -> Self {
        Self { store }
    }

    pub async fn create_set(&self, user: &User, req: CreateSetRequest) -> Result<StudySet, AppError> {
        req.validate()?;
        let set = self.store.create_set(user.id, &req).await?;
        tracing::info!(user_id = user.id, set_id = set.id, "Set created");
        Ok(set)
    }

    /// 分页列出集合：多取一条以判断是否还有更多
    pub async fn list_sets(
        &self,
        user: &User,
        query: &ListSetsQuery,
    ) -> Result<(Vec<StudySet>, Pagination), AppError> {
        query.validate_bounds().map_err(AppError::BadRequest)?;
        let since = query.since().map_err(AppError::BadRequest)?;

        let mut sets = self
            .store
            .list_sets(user.id, since, query.skip, query.limit + 1)
            .await?;

        let has_more = sets.len() as i64 > query.limit;
        sets.truncate(query.limit as usize);

        let pagination = Pagination {
            skip: query.skip,
            limit: query.limit,
            count: sets.len(),
            has_more,
        };

        Ok((sets, pagination))
    }

    pub async fn get_set(&self, user: &User, set_id: i64) -> Result<StudySet, AppError> {
        self.store
            .get_set(user.id, set_id)
            .await?
            .ok_or_else(|| AppError::NotFound(SET_NOT_FOUND.to_string()))
    }

    pub async fn update_set(
        &self,
        user: &User,
        set_id: i64,
        req: UpdateSetRequest,
    ) -> Result<StudySet, AppError> {
        req.validate()?;
        self.store
            .update_set(user.id, set_id, &req)
            .await?
            .ok_or_else(|| AppError::NotFound(SET_NOT_FOUND.to_string()))
    }

    pub async fn delete_set(&self, user: &User, set_id: i64) -> Result<(), AppError> {
        if !self.store.delete_set(user.id, set_id).await? {
            return Err(AppError::NotFound(SET_NOT_FOUND.to_string()));
        }
        tracing::info!(user_id = user.id, set_id, "Set deleted");
        Ok(())
    }

    pub async fn list_cards(&self, user: &User, set_id: i64) -> Result<Vec<Card>, AppError> {
        Ok(self.store.list_cards(user.id, set_id).await?)
    }

    pub async fn create_card(&self, user: &User, req: CreateCardRequest) -> Result<Card, AppError> {
        if req.term.trim().is_empty() || req.definition.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Term and definition are required".to_string(),
            ));
        }

        self.store
            .create_card(user.id, &req)
            .await?
            .ok_or_else(|| AppError::NotFound(SET_NOT_FOUND.to_string()))
    }

    pub async fn get_card(&self, user: &User, card_id: i64) -> Result<Card, AppError> {
        self.store
            .get_card(user.id, card_id)
            .await?
            .ok_or_else(|| AppError::NotFound(CARD_NOT_FOUND.to_string()))
    }

    pub async fn update_card(
        &self,
        user: &User,
        card_id: i64,
        req: UpdateCardRequest,
    ) -> Result<Card, AppError> {
        self.store
            .update_card(user.id, card_id, &req)
            .await?
            .ok_or_else(|| AppError::NotFound(CARD_NOT_FOUND.to_string()))
    }

    pub async fn delete_card(&self, user: &User, card_id: i64) -> Result<(), AppError> {
        if !self.store.delete_card(user.id, card_id).await? {
            return Err(AppError::NotFound(CARD_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    /// 批量创建/更新卡片，全部成功或全部回滚
    pub async fn upsert_cards(
        &self,
        user: &User,
        set_id: i64,
        req: BatchCardsRequest,
    ) -> Result<Vec<Card>, AppError> {
        if self.store.get_set(user.id, set_id).await?.is_none() {
            return Err(AppError::NotFound(SET_NOT_FOUND.to_string()));
        }

        if req.cards.is_empty() {
            return Err(AppError::BadRequest("No cards provided".to_string()));
        }

        // 新建卡片必须包含 term 与 definition
        for entry in req.cards.iter().filter(|c| c.id.is_none()) {
            let has_term = entry.term.as_deref().is_some_and(|t| !t.trim().is_empty());
            let has_definition = entry
                .definition
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
            if !has_term || !has_definition {
                return Err(AppError::BadRequest(
                    "New cards require term and definition".to_string(),
                ));
            }
        }

        let cards = self.store.upsert_cards(set_id, &req.cards).await?;
        tracing::info!(user_id = user.id, set_id, count = cards.len(), "Cards upserted");
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{card::CardUpsert, user::NewUser},
        repository::{MemoryStore, PrincipalStore},
    };

    async fn setup() -> (StudyService, User, User) {
        let store = Arc::new(MemoryStore::new());
        let mut users = Vec::new();
        for email in ["a@example.com", "b@example.com"] {
            users.push(
                store
                    .create(NewUser {
                        email: email.to_string(),
                        name: None,
                        password_hash: "x".to_string(),
                    })
                    .await
                    .unwrap(),
            );
        }
        let other = users.pop().unwrap();
        let owner = users.pop().unwrap();
        (StudyService::new(store), owner, other)
    }

    fn new_set(title: &str) -> CreateSetRequest {
        CreateSetRequest {
            title: title.to_string(),
            description: None,
            term_lang: None,
            definition_lang: None,
            is_public: false,
        }
    }

    fn query(skip: i64, limit: i64) -> ListSetsQuery {
        ListSetsQuery {
            since: None,
            skip,
            limit,
        }
    }

    #[tokio::test]
    async fn test_list_sets_pagination() {
        let (service, owner, _) = setup().await;
        for i in 0..3 {
            service.create_set(&owner, new_set(&format!("Set {}", i))).await.unwrap();
        }

        let (sets, page) = service.list_sets(&owner, &query(0, 2)).await.unwrap();
        assert_eq!(sets.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.count, 2);

        let (sets, page) = service.list_sets(&owner, &query(2, 2)).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_list_sets_rejects_bad_limit() {
        let (service, owner, _) = setup().await;
        assert!(service.list_sets(&owner, &query(0, 0)).await.is_err());
        assert!(service.list_sets(&owner, &query(-1, 10)).await.is_err());
    }

    #[tokio::test]
    async fn test_sets_are_owner_scoped() {
        let (service, owner, other) = setup().await;
        let set = service.create_set(&owner, new_set("Mine")).await.unwrap();

        let err = service.get_set(&other, set.id).await.unwrap_err();
        assert_eq!(err.user_message(), "Set not found");
        assert!(service.delete_set(&other, set.id).await.is_err());
        assert!(service.get_set(&owner, set.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_cards_validation() {
        let (service, owner, other) = setup().await;
        let set = service.create_set(&owner, new_set("Mine")).await.unwrap();

        let empty = BatchCardsRequest { cards: vec![] };
        let err = service.upsert_cards(&owner, set.id, empty).await.unwrap_err();
        assert_eq!(err.user_message(), "No cards provided");

        let missing_definition = BatchCardsRequest {
            cards: vec![CardUpsert {
                term: Some("hola".to_string()),
                ..Default::default()
            }],
        };
        let err = service
            .upsert_cards(&owner, set.id, missing_definition)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);

        let foreign = BatchCardsRequest {
            cards: vec![CardUpsert {
                term: Some("hola".to_string()),
                definition: Some("hello".to_string()),
                ..Default::default()
            }],
        };
        let err = service.upsert_cards(&other, set.id, foreign).await.unwrap_err();
        assert_eq!(err.user_message(), "Set not found");
    }

    #[tokio::test]
    async fn test_upsert_cards_unknown_id_aborts_batch() {
        let (service, owner, _) = setup().await;
        let set = service.create_set(&owner, new_set("Mine")).await.unwrap();

        let batch = BatchCardsRequest {
            cards: vec![
                CardUpsert {
                    term: Some("uno".to_string()),
                    definition: Some("one".to_string()),
                    ..Default::default()
                },
                CardUpsert {
                    id: Some(999),
                    term: Some("dos".to_string()),
                    ..Default::default()
                },
            ],
        };
        let err = service.upsert_cards(&owner, set.id, batch).await.unwrap_err();
        assert_eq!(err.user_message(), "Card with ID 999 not found");
        assert!(service.list_cards(&owner, set.id).await.unwrap().is_empty());
    }
}
