//! In-process store
//!
//! Backs the `memory` database backend and the test suite. All state lives
//! behind one `RwLock`, so each write (including uniqueness checks) is atomic
//! with respect to every other store operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{BatchError, PrincipalStore, StoreError, StudyStore, UniqueField};
use crate::models::{
    card::{Card, CardUpsert, CreateCardRequest, UpdateCardRequest},
    study_set::{CreateSetRequest, StudySet, UpdateSetRequest},
    user::{NewUser, TokenMaterial, User},
};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    sets: BTreeMap<i64, StudySet>,
    cards: BTreeMap<i64, Card>,
    /// token identifier -> user id
    token_index: HashMap<String, i64>,
    next_user_id: i64,
    next_set_id: i64,
    next_card_id: i64,
}

impl State {
    fn next_user_id(&mut self) -> i64 {
        self.next_user_id += 1;
        self.next_user_id
    }

    fn next_set_id(&mut self) -> i64 {
        self.next_set_id += 1;
        self.next_set_id
    }

    fn next_card_id(&mut self) -> i64 {
        self.next_card_id += 1;
        self.next_card_id
    }

    fn owns_set(&self, user_id: i64, set_id: i64) -> bool {
        self.sets
            .get(&set_id)
            .is_some_and(|set| set.user_id == user_id)
    }

    fn owned_card_mut(&mut self, user_id: i64, card_id: i64) -> Option<&mut Card> {
        let set_id = self.cards.get(&card_id)?.set_id;
        if !self.owns_set(user_id, set_id) {
            return None;
        }
        self.cards.get_mut(&card_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_token_identifier(&self, token_id: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .token_index
            .get(token_id)
            .and_then(|user_id| state.users.get(user_id))
            .cloned())
    }

    async fn find_all_with_unexpired_token(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.token_id.is_none() && u.has_live_token(now))
            .cloned()
            .collect())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        let now = Utc::now();
        let user = User {
            id: state.next_user_id(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            token_id: None,
            token_hash: None,
            token_expires: None,
            last_login: now,
            created_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn save_token(
        &self,
        user_id: i64,
        material: &TokenMaterial,
    ) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        if let Some(token_id) = material.token_id.as_deref() {
            let taken = state
                .token_index
                .get(token_id)
                .is_some_and(|owner| *owner != user_id);
            if taken {
                return Err(StoreError::Conflict(UniqueField::TokenId));
            }
        }

        let state = &mut *state;
        let user = state.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        if let Some(previous) = user.token_id.take() {
            state.token_index.remove(&previous);
        }
        if let Some(token_id) = material.token_id.clone() {
            state.token_index.insert(token_id, user_id);
        }

        user.token_id = material.token_id.clone();
        user.token_hash = Some(material.token_hash.clone());
        user.token_expires = Some(material.expires_at);
        user.last_login = material.issued_at;

        Ok(user.clone())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl StudyStore for MemoryStore {
    async fn create_set(
        &self,
        user_id: i64,
        req: &CreateSetRequest,
    ) -> Result<StudySet, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }

        let set = StudySet {
            id: state.next_set_id(),
            user_id,
            title: req.title.clone(),
            description: req.description.clone(),
            term_lang: req.term_lang.clone(),
            definition_lang: req.definition_lang.clone(),
            is_public: req.is_public,
            created_at: Utc::now(),
        };
        state.sets.insert(set.id, set.clone());

        Ok(set)
    }

    async fn list_sets(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<StudySet>, StoreError> {
        let state = self.state.read().await;
        let mut sets: Vec<StudySet> = state
            .sets
            .values()
            .filter(|s| s.user_id == user_id && s.created_at > since)
            .cloned()
            .collect();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(sets
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_set(&self, user_id: i64, set_id: i64) -> Result<Option<StudySet>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .sets
            .get(&set_id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn update_set(
        &self,
        user_id: i64,
        set_id: i64,
        req: &UpdateSetRequest,
    ) -> Result<Option<StudySet>, StoreError> {
        let mut state = self.state.write().await;
        let Some(set) = state.sets.get_mut(&set_id).filter(|s| s.user_id == user_id) else {
            return Ok(None);
        };

        req.apply_to(set);
        Ok(Some(set.clone()))
    }

    async fn delete_set(&self, user_id: i64, set_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.owns_set(user_id, set_id) {
            return Ok(false);
        }

        state.sets.remove(&set_id);
        state.cards.retain(|_, card| card.set_id != set_id);
        Ok(true)
    }

    async fn list_cards(&self, user_id: i64, set_id: i64) -> Result<Vec<Card>, StoreError> {
        let state = self.state.read().await;
        if !state.owns_set(user_id, set_id) {
            return Ok(Vec::new());
        }

        Ok(state
            .cards
            .values()
            .filter(|c| c.set_id == set_id)
            .cloned()
            .collect())
    }

    async fn create_card(
        &self,
        user_id: i64,
        req: &CreateCardRequest,
    ) -> Result<Option<Card>, StoreError> {
        let mut state = self.state.write().await;
        if !state.owns_set(user_id, req.set) {
            return Ok(None);
        }

        let card = Card {
            id: state.next_card_id(),
            set_id: req.set,
            term: req.term.clone(),
            definition: req.definition.clone(),
            image_url: req.image_url.clone(),
            audio_url: req.audio_url.clone(),
        };
        state.cards.insert(card.id, card.clone());

        Ok(Some(card))
    }

    async fn get_card(&self, user_id: i64, card_id: i64) -> Result<Option<Card>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .cards
            .get(&card_id)
            .filter(|c| state.owns_set(user_id, c.set_id))
            .cloned())
    }

    async fn update_card(
        &self,
        user_id: i64,
        card_id: i64,
        req: &UpdateCardRequest,
    ) -> Result<Option<Card>, StoreError> {
        let mut state = self.state.write().await;
        let Some(card) = state.owned_card_mut(user_id, card_id) else {
            return Ok(None);
        };

        if let Some(term) = &req.term {
            card.term = term.clone();
        }
        if let Some(definition) = &req.definition {
            card.definition = definition.clone();
        }
        Ok(Some(card.clone()))
    }

    async fn delete_card(&self, user_id: i64, card_id: i64) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.owned_card_mut(user_id, card_id).is_none() {
            return Ok(false);
        }

        state.cards.remove(&card_id);
        Ok(true)
    }

    async fn upsert_cards(
        &self,
        set_id: i64,
        cards: &[CardUpsert],
    ) -> Result<Vec<Card>, BatchError> {
        let mut state = self.state.write().await;

        // Check every update target first so a failure leaves no partial writes
        for entry in cards {
            if let Some(card_id) = entry.id {
                let in_set = state.cards.get(&card_id).is_some_and(|c| c.set_id == set_id);
                if !in_set {
                    return Err(BatchError::CardNotFound(card_id));
                }
            }
        }

        let mut results = Vec::with_capacity(cards.len());
        for entry in cards {
            let card = match entry.id {
                Some(card_id) => {
                    let card = state
                        .cards
                        .get_mut(&card_id)
                        .ok_or(BatchError::CardNotFound(card_id))?;
                    entry.apply_to(card);
                    card.clone()
                }
                None => {
                    let card = Card {
                        id: state.next_card_id(),
                        set_id,
                        term: entry.term.clone().unwrap_or_default(),
                        definition: entry.definition.clone().unwrap_or_default(),
                        image_url: entry.image_url.clone(),
                        audio_url: entry.audio_url.clone(),
                    };
                    state.cards.insert(card.id, card.clone());
                    card
                }
            };
            results.push(card);
        }

        Ok(results)
    }
}
