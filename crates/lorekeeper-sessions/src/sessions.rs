//! Sqlite-backed [`SessionStore`] (C7): an append-only chat-session log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::{ChatMessage, ChatSession, ChatSessionSummary, Reference, Role};
use lorekeeper_core::traits::SessionStore;

use crate::storage::SqlitePool;

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, owner: &str, title: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO chat_sessions (id, owner, title, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, owner, title, now.to_rfc3339()],
        )?;
        Ok(id)
    }

    async fn append_turn(
        &self,
        id: &str,
        user_msg: &str,
        assistant_msg: &str,
        sources: Vec<Reference>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM chat_sessions WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::not_found(format!("chat session {id}")));
        }

        let next_seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM chat_messages WHERE session_id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        let now = Utc::now();
        let sources_json = serde_json::to_string(&sources).unwrap_or_default();

        conn.execute(
            "INSERT INTO chat_messages (session_id, seq, role, content, sources, timestamp)
             VALUES (?1, ?2, 'user', ?3, NULL, ?4)",
            params![id, next_seq, user_msg, now.to_rfc3339()],
        )?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, seq, role, content, sources, timestamp)
             VALUES (?1, ?2, 'assistant', ?3, ?4, ?5)",
            params![id, next_seq + 1, assistant_msg, sources_json, now.to_rfc3339()],
        )?;
        conn.execute(
            "UPDATE chat_sessions SET updated_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<ChatSession> {
        let conn = self.pool.get()?;
        let (owner, title, updated_at): (String, String, String) = conn
            .query_row(
                "SELECT owner, title, updated_at FROM chat_sessions WHERE id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| Error::not_found(format!("chat session {id}")))?;

        let mut stmt = conn.prepare(
            "SELECT role, content, sources, timestamp FROM chat_messages
             WHERE session_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![id], |r| {
            let role: String = r.get(0)?;
            let content: String = r.get(1)?;
            let sources: Option<String> = r.get(2)?;
            let timestamp: String = r.get(3)?;
            Ok((role, content, sources, timestamp))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, sources, timestamp) = row?;
            messages.push(ChatMessage {
                role: if role == "user" { Role::User } else { Role::Assistant },
                content,
                sources: sources.and_then(|s| serde_json::from_str(&s).ok()),
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }

        Ok(ChatSession {
            id: id.to_string(),
            owner,
            title,
            messages,
            updated_at: DateTime::parse_from_rfc3339(&updated_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    async fn list_by_owner(
        &self,
        owner: &str,
        page: usize,
        size: usize,
    ) -> Result<Vec<ChatSessionSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.owner, s.title, s.updated_at,
                    (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
             FROM chat_sessions s
             WHERE s.owner = ?1
             ORDER BY s.updated_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![owner, size as i64, (page * size) as i64],
            |r| {
                let updated_at: String = r.get(3)?;
                let count: i64 = r.get(4)?;
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    updated_at,
                    count,
                ))
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            let (id, owner, title, updated_at, count) = row?;
            out.push(ChatSessionSummary {
                id,
                owner,
                title,
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                message_count: count.max(0) as usize,
            });
        }
        Ok(out)
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<()> {
        let conn = self.pool.get()?;
        let recorded_owner: Option<String> = conn
            .query_row(
                "SELECT owner FROM chat_sessions WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(recorded_owner) = recorded_owner else {
            return Err(Error::not_found(format!("chat session {id}")));
        };
        if recorded_owner != owner {
            return Err(Error::PermissionDenied);
        }
        conn.execute("DELETE FROM chat_messages WHERE session_id = ?1", params![id])?;
        conn.execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SqliteSessionStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.sqlite3");
        std::mem::forget(dir);
        let pool = crate::storage::open_pool(path.to_str().unwrap()).unwrap();
        SqliteSessionStore::new(pool)
    }

    #[tokio::test]
    async fn create_then_get_returns_empty_session() {
        let store = temp_store();
        let id = store.create("alice", "first chat").await.unwrap();
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.owner, "alice");
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn append_turn_records_both_messages_in_order() {
        let store = temp_store();
        let id = store.create("alice", "chat").await.unwrap();
        store
            .append_turn(&id, "hello", "hi there", vec![])
            .await
            .unwrap();

        let session = store.get(&id).await.unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn append_turn_on_unknown_session_is_not_found() {
        let store = temp_store();
        let err = store
            .append_turn("does-not-exist", "hi", "hi", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.category(), "NotFound");
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_permission_denied() {
        let store = temp_store();
        let id = store.create("alice", "chat").await.unwrap();
        let err = store.delete(&id, "mallory").await.unwrap_err();
        assert_eq!(err.category(), "PermissionDenied");
    }

    #[tokio::test]
    async fn list_by_owner_orders_most_recently_updated_first() {
        let store = temp_store();
        let first = store.create("alice", "older").await.unwrap();
        let second = store.create("alice", "newer").await.unwrap();
        store.append_turn(&second, "hi", "hi", vec![]).await.unwrap();

        let summaries = store.list_by_owner("alice", 0, 10).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, second);
        assert_eq!(summaries[1].id, first);
    }
}
