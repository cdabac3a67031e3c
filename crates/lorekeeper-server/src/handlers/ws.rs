//! WebSocket bridges for the two streaming operations (§6): ingestion
//! progress (C8) and agentic search turns (C10). Both speak the same
//! wire shape as the typed event bus itself — `{type, data}` text frames
//! — so the bridge is purely "read one control message, forward the bus".

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;

use lorekeeper_core::model::{Caller, NewArticle};

use crate::auth_extractor::{AuthenticatedCaller, OptionalCaller};
use crate::state::AppState;

async fn send_event(socket: &mut WebSocket, event: &lorekeeper_core::events::Event) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(t) => t,
        Err(_) => return false,
    };
    socket.send(Message::Text(text)).await.is_ok()
}

async fn drain_into_socket(socket: &mut WebSocket, mut events: lorekeeper_streaming::EventReceiver) {
    while let Some(event) = events.recv().await {
        let terminal = event.is_terminal();
        if !send_event(socket, &event).await {
            break;
        }
        if terminal {
            break;
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_size")]
    size: usize,
    #[serde(default)]
    session_id: Option<String>,
}

fn default_size() -> usize {
    5
}

pub async fn ws_search(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    OptionalCaller(caller): OptionalCaller,
) -> Response {
    ws.on_upgrade(move |socket| handle_search(socket, state, caller))
}

async fn handle_search(mut socket: WebSocket, state: AppState, caller: Caller) {
    let Some(Ok(Message::Text(text))) = socket.recv().await else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };
    let Ok(req) = serde_json::from_str::<SearchRequest>(&text) else {
        let _ = socket
            .send(Message::Text(
                serde_json::json!({"type": "error", "data": "malformed search request"})
                    .to_string(),
            ))
            .await;
        return;
    };

    let (tx, rx) = lorekeeper_streaming::channel();
    let agent = state.agent.clone();
    let turn_timeout = Duration::from_secs(state.config.turn_timeout_secs);
    let handle = tokio::spawn(async move {
        tokio::time::timeout(
            turn_timeout,
            agent.search_stream(&caller, &req.query, req.size, req.session_id, &tx),
        )
        .await
        .unwrap_or(Err(lorekeeper_core::error::Error::Cancelled))
    });

    drain_into_socket(&mut socket, rx).await;
    let _ = handle.await;
    let _ = socket.send(Message::Close(None)).await;
}

pub async fn ws_ingest(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> Response {
    ws.on_upgrade(move |socket| handle_ingest(socket, state, caller))
}

async fn handle_ingest(mut socket: WebSocket, state: AppState, caller: Caller) {
    let Some(Ok(Message::Text(text))) = socket.recv().await else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };
    let Ok(raw) = serde_json::from_str::<NewArticle>(&text) else {
        let _ = socket
            .send(Message::Text(
                serde_json::json!({"type": "error", "data": "malformed article"}).to_string(),
            ))
            .await;
        return;
    };

    let (tx, rx) = lorekeeper_streaming::channel();
    let ingestion = state.ingestion.clone();
    let turn_timeout = Duration::from_secs(state.config.turn_timeout_secs);
    let handle = tokio::spawn(async move {
        tokio::time::timeout(turn_timeout, ingestion.ingest(&caller, raw, &tx))
            .await
            .unwrap_or(Err(lorekeeper_core::error::Error::Cancelled))
    });

    drain_into_socket(&mut socket, rx).await;
    let _ = handle.await;
    let _ = socket.send(Message::Close(None)).await;
}
