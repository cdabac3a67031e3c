//! `/search` handler (C9+C10, §6): a non-streaming view onto the agentic
//! search session for callers that just want the final turn.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use lorekeeper_core::events::Event;
use lorekeeper_core::model::Reference;

use crate::auth_extractor::OptionalCaller;
use crate::error_response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_size() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub answer: String,
    pub sources: Vec<Reference>,
    pub session_id: Option<String>,
    pub took_ms: u128,
}

pub async fn search(
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let started = Instant::now();
    let (tx, mut rx) = lorekeeper_streaming::channel();
    let agent = state.agent.clone();
    let caller_owned = caller.clone();
    let query = req.query.clone();
    let session_id = req.session_id.clone();
    let turn_timeout = Duration::from_secs(state.config.turn_timeout_secs);
    let handle = tokio::spawn(async move {
        tokio::time::timeout(
            turn_timeout,
            agent.search_stream(&caller_owned, &query, req.size, session_id, &tx),
        )
        .await
        .unwrap_or(Err(lorekeeper_core::error::Error::Cancelled))
    });

    let mut answer = String::new();
    let mut sources = Vec::new();
    let mut resolved_session_id = None;
    while let Some(event) = rx.recv().await {
        match event {
            Event::Sources(refs) => sources = refs,
            Event::Answer(text) => answer = text,
            Event::Done(done) => resolved_session_id = done.session_id,
            _ => {}
        }
    }

    handle
        .await
        .map_err(|e| lorekeeper_core::error::Error::internal(e.to_string()))??;

    state.metrics.search_turns_total.inc();

    Ok(Json(SearchResponse {
        answer,
        sources,
        session_id: resolved_session_id,
        took_ms: started.elapsed().as_millis(),
    }))
}
