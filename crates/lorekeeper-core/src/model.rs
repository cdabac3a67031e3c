//! The shared data model: [`Article`], [`ChatSession`], and the small value
//! types that travel between components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dimensionality every embedding vector in this system must have.
pub const EMBEDDING_DIM: usize = 768;

/// The eight supported language codes, in the order the detector should
/// prefer on ties.
pub const SUPPORTED_LANGUAGES: [&str; 8] =
    ["ko", "en", "ja", "zh", "es", "fr", "de", "ru"];

/// Fallback language for anything the detector cannot confidently classify.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Returns `true` if `lang` is one of the eight supported codes.
#[must_use]
pub fn is_supported_language(lang: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&lang)
}

/// The atomic indexed unit (§3 Article).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub lang: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    pub created_date: DateTime<Utc>,
    pub registrar: String,
    #[serde(default)]
    pub title_embedding: Vec<f32>,
    #[serde(default)]
    pub summary_embedding: Vec<f32>,
}

impl Article {
    /// `true` when both embeddings are present and exactly [`EMBEDDING_DIM`] long.
    #[must_use]
    pub fn has_valid_embeddings(&self) -> bool {
        self.title_embedding.len() == EMBEDDING_DIM && self.summary_embedding.len() == EMBEDDING_DIM
    }
}

/// Caller-supplied fields for a new article, before C8 fills in the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

/// A scored lexical hit (§4.5): the full article payload plus a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub article: Article,
    pub score: f32,
}

/// A search result item exposed to callers: `{article, score}` (§ Glossary, Reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub article: Article,
    pub score: f32,
}

/// One message in a [`ChatSession`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Reference>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An append-only chat-session log keyed by session id and owner (§3 ChatSession, C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    /// User identifier, or empty for an anonymous session.
    pub owner: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
}

/// A lightweight projection of [`ChatSession`] used by `listByOwner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionSummary {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// A registered user (ambient A3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of [`User`] safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        PublicUser {
            id: u.id.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
        }
    }
}

/// An opaque bearer token granting a caller identity (ambient A3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// The identity established for the current request, empty/anonymous for
/// unauthenticated callers where the endpoint allows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(pub Option<String>);

impl Caller {
    #[must_use]
    pub fn anonymous() -> Self {
        Caller(None)
    }

    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Caller(Some(id.into()))
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn require(&self) -> crate::error::Result<&str> {
        self.0
            .as_deref()
            .ok_or(crate::error::Error::Unauthorized)
    }
}
