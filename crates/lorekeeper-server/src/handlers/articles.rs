//! `/articles*` handlers (§6).

use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorekeeper_core::model::{Article, NewArticle};

use crate::auth_extractor::{AuthenticatedCaller, OptionalCaller};
use crate::error_response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ArticleAdmitted {
    pub id: String,
    pub summary: String,
}

async fn run_ingestion(
    state: &AppState,
    caller: &lorekeeper_core::model::Caller,
    raw: NewArticle,
) -> Result<ArticleAdmitted, ApiError> {
    let (tx, mut rx) = lorekeeper_streaming::channel();
    let ingestion = state.ingestion.clone();
    let caller = caller.clone();
    let turn_timeout = Duration::from_secs(state.config.turn_timeout_secs);
    let handle = tokio::spawn(async move {
        tokio::time::timeout(turn_timeout, ingestion.ingest(&caller, raw, &tx))
            .await
            .unwrap_or(Err(lorekeeper_core::error::Error::Cancelled))
    });

    // Drain the bus; we only need the terminal outcome for a non-streaming call.
    while rx.recv().await.is_some() {}
    let id = handle
        .await
        .map_err(|e| lorekeeper_core::error::Error::internal(e.to_string()))??;

    let article = state
        .lexical
        .get_by_id(&id)
        .await?
        .ok_or_else(|| lorekeeper_core::error::Error::internal("admitted article vanished"))?;

    Ok(ArticleAdmitted {
        id,
        summary: article.summary,
    })
}

pub async fn create_article(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(req): Json<CreateArticleRequest>,
) -> Result<Json<ArticleAdmitted>, ApiError> {
    let raw = NewArticle {
        title: req.title,
        content: req.content,
        author: req.author,
        original_url: req.original_url,
        created_date: req.created_date,
    };
    Ok(Json(run_ingestion(&state, &caller, raw).await?))
}

pub async fn upload_article(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    mut multipart: Multipart,
) -> Result<Json<ArticleAdmitted>, ApiError> {
    let mut filename = String::new();
    let mut bytes = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| lorekeeper_core::error::Error::validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("upload").to_string();
            bytes = field
                .bytes()
                .await
                .map_err(|e| lorekeeper_core::error::Error::validation(e.to_string()))?
                .to_vec();
        }
    }
    if bytes.is_empty() {
        return Err(lorekeeper_core::error::Error::validation("no file field provided").into());
    }

    let parsed = state.documents.parse(&bytes, &filename)?;
    let raw = NewArticle {
        title: parsed.title,
        content: parsed.content,
        author: None,
        original_url: None,
        created_date: None,
    };
    Ok(Json(run_ingestion(&state, &caller, raw).await?))
}

pub async fn get_article(
    State(state): State<AppState>,
    OptionalCaller(_caller): OptionalCaller,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let article = state
        .lexical
        .get_by_id(&id)
        .await?
        .ok_or_else(|| lorekeeper_core::error::Error::not_found(format!("article {id}")))?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Path(id): Path<String>,
) -> Result<(), ApiError> {
    let article = state
        .lexical
        .get_by_id(&id)
        .await?
        .ok_or_else(|| lorekeeper_core::error::Error::not_found(format!("article {id}")))?;
    if Some(article.registrar.as_str()) != caller.id() {
        return Err(lorekeeper_core::error::Error::PermissionDenied.into());
    }
    state.lexical.delete(&id).await?;
    // Best-effort: a failed vector delete leaves a vector-only orphan,
    // which C9 already tolerates and drops at hydration (§4.9 step 6).
    if let Err(e) = state.vector.delete(&id).await {
        tracing::warn!(error = %e, article_id = %id, "vector index delete failed");
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ListUserArticlesRequest {
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub from: usize,
    #[serde(default = "default_page_size")]
    pub size: usize,
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct ListUserArticlesResponse {
    pub total: usize,
    pub articles: Vec<Article>,
}

pub async fn list_user_articles(
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
    Json(req): Json<ListUserArticlesRequest>,
) -> Result<Json<ListUserArticlesResponse>, ApiError> {
    let owner = caller.require()?.to_string();
    let (total, articles) = state
        .lexical
        .list_by_owner(&owner, req.date_from, req.date_to, req.from, req.size)
        .await?;
    Ok(Json(ListUserArticlesResponse { total, articles }))
}
