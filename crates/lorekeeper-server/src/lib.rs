//! Router construction for the lorekeeper HTTP/WebSocket API (§6).

pub mod auth_extractor;
pub mod error_response;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route("/metrics", get(handlers::health::metrics))
        .route("/users", post(handlers::users::register))
        .route("/users/auth", post(handlers::users::login))
        .route("/users/me", get(handlers::users::me))
        .route("/articles", post(handlers::articles::create_article))
        .route("/articles/upload", post(handlers::articles::upload_article))
        .route("/articles/user", post(handlers::articles::list_user_articles))
        .route(
            "/articles/{id}",
            get(handlers::articles::get_article).delete(handlers::articles::delete_article),
        )
        .route("/search", post(handlers::search::search))
        .route("/chat/history", get(handlers::chat::list_history))
        .route(
            "/chat/history/{id}",
            get(handlers::chat::get_history).delete(handlers::chat::delete_history),
        )
        .route("/search_stream", get(handlers::ws::ws_search))
        .route("/ingest_stream", get(handlers::ws::ws_ingest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
