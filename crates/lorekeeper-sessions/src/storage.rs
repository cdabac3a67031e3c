//! `rusqlite` schema shared by the session log (C7) and the auth store (A3).
//! Both live in the same database file as the lexical index per the
//! single-shared-file decision.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use lorekeeper_core::error::Error;
use lorekeeper_core::error::Result;

pub type SqlitePool = Pool<SqliteConnectionManager>;

pub fn open_pool(path: &str) -> Result<SqlitePool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::new(manager).map_err(|e| Error::internal(format!("opening sqlite pool: {e}")))?;
    init_schema(&pool)?;
    Ok(pool)
}

pub fn init_schema(pool: &SqlitePool) -> Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_sessions (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            title TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_sessions_owner ON chat_sessions(owner);

        CREATE TABLE IF NOT EXISTS chat_messages (
            session_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            sources TEXT,
            timestamp TEXT NOT NULL,
            PRIMARY KEY (session_id, seq)
        );

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS auth_tokens (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id);",
    )?;
    Ok(())
}
