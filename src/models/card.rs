//! Flashcard models

use serde::{Deserialize, Serialize};

/// Card belonging to a study set
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Card {
    pub id: i64,
    pub set_id: i64,
    pub term: String,
    pub definition: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Create card request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardRequest {
    /// Owning set id
    pub set: i64,
    pub term: String,
    pub definition: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Partial card update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCardRequest {
    pub term: Option<String>,
    pub definition: Option<String>,
}

/// One entry of a batch: update when `id` is present, create otherwise
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardUpsert {
    pub id: Option<i64>,
    pub term: Option<String>,
    pub definition: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

impl CardUpsert {
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(term) = &self.term {
            card.term = term.clone();
        }
        if let Some(definition) = &self.definition {
            card.definition = definition.clone();
        }
        if let Some(image_url) = &self.image_url {
            card.image_url = Some(image_url.clone());
        }
        if let Some(audio_url) = &self.audio_url {
            card.audio_url = Some(audio_url.clone());
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchCardsRequest {
    #[serde(default)]
    pub cards: Vec<CardUpsert>,
}

/// Card response
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CardResponse {
    pub id: i64,
    pub term: String,
    pub definition: String,
    pub set: i64,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            term: card.term,
            definition: card.definition,
            set: card.set_id,
            image_url: card.image_url,
            audio_url: card.audio_url,
        }
    }
}
