//! Chat session log (C7) and bearer-token auth (A3), sharing one sqlite
//! database file.
//!
//! - [`SqliteSessionStore`] implements [`lorekeeper_core::traits::SessionStore`].
//! - [`AuthStore`] is the ambient registration/login/token surface the HTTP
//!   layer sits in front of; it has no trait in `lorekeeper-core` since auth
//!   is ambient rather than a pluggable retrieval collaborator.

pub mod auth;
pub mod sessions;
pub mod storage;

pub use auth::AuthStore;
pub use sessions::SqliteSessionStore;
pub use storage::{open_pool, SqlitePool};
