//! Bearer-token auth (ambient A3): argon2 password hashing, UUIDv4 tokens
//! with a server-side TTL, sharing the session-store database file.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use lorekeeper_core::error::{Error, Result};
use lorekeeper_core::model::{AuthToken, User};

use crate::storage::SqlitePool;

pub struct AuthStore {
    pool: SqlitePool,
    token_ttl: Duration,
}

impl AuthStore {
    #[must_use]
    pub fn new(pool: SqlitePool, token_ttl_seconds: i64) -> Self {
        Self {
            pool,
            token_ttl: Duration::seconds(token_ttl_seconds),
        }
    }

    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() || password.len() < 8 {
            return Err(Error::validation(
                "username must be non-empty and password at least 8 characters",
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::internal(format!("hashing password: {e}")))?
            .to_string();

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339()
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref se, _)
                if se.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::Conflict(format!("username or email already registered: {e}"))
            }
            other => Error::from(other),
        })?;

        Ok(user)
    }

    pub fn verify_password(&self, username: &str, password: &str) -> Result<User> {
        let conn = self.pool.get()?;
        let row: Option<(String, String, String, String, String)> = conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .optional()?;

        let Some((id, username, email, password_hash, created_at)) = row else {
            return Err(Error::Unauthorized);
        };

        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| Error::internal(format!("parsing stored password hash: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| Error::Unauthorized)?;

        Ok(User {
            id,
            username,
            email,
            password_hash: String::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    pub fn issue_token(&self, user_id: &str) -> Result<AuthToken> {
        let token = AuthToken {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.token_ttl,
        };
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO auth_tokens (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token.token, token.user_id, token.expires_at.to_rfc3339()],
        )?;
        Ok(token)
    }

    /// Returns the owning user id for a still-valid token, or
    /// [`Error::Unauthorized`] if missing or expired.
    pub fn authenticate(&self, token: &str) -> Result<String> {
        let conn = self.pool.get()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM auth_tokens WHERE token = ?1",
                params![token],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let Some((user_id, expires_at)) = row else {
            return Err(Error::Unauthorized);
        };
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        if expires_at < Utc::now() {
            return Err(Error::Unauthorized);
        }
        Ok(user_id)
    }

    pub fn revoke(&self, token: &str) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM auth_tokens WHERE token = ?1", params![token])?;
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT id, username, email, created_at FROM users WHERE id = ?1",
                params![id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;

        Ok(row.map(|(id, username, email, created_at)| User {
            id,
            username,
            email,
            password_hash: String::new(),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> AuthStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.sqlite3");
        std::mem::forget(dir);
        let pool = crate::storage::open_pool(path.to_str().unwrap()).unwrap();
        AuthStore::new(pool, 3600)
    }

    #[test]
    fn register_then_verify_succeeds_with_correct_password() {
        let store = temp_store();
        store.register("alice", "alice@example.com", "correcthorsebattery").unwrap();
        let user = store.verify_password("alice", "correcthorsebattery").unwrap();
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn verify_with_wrong_password_is_unauthorized() {
        let store = temp_store();
        store.register("alice", "alice@example.com", "correcthorsebattery").unwrap();
        let err = store.verify_password("alice", "wrongpassword").unwrap_err();
        assert_eq!(err.category(), "Unauthorized");
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let store = temp_store();
        store.register("alice", "alice@example.com", "correcthorsebattery").unwrap();
        let err = store
            .register("alice", "other@example.com", "anotherpassword")
            .unwrap_err();
        assert_eq!(err.category(), "Conflict");
    }

    #[test]
    fn issued_token_authenticates_to_the_right_user() {
        let store = temp_store();
        let user = store.register("alice", "alice@example.com", "correcthorsebattery").unwrap();
        let token = store.issue_token(&user.id).unwrap();
        let user_id = store.authenticate(&token.token).unwrap();
        assert_eq!(user_id, user.id);
    }

    #[test]
    fn revoked_token_no_longer_authenticates() {
        let store = temp_store();
        let user = store.register("alice", "alice@example.com", "correcthorsebattery").unwrap();
        let token = store.issue_token(&user.id).unwrap();
        store.revoke(&token.token).unwrap();
        let err = store.authenticate(&token.token).unwrap_err();
        assert_eq!(err.category(), "Unauthorized");
    }

    #[test]
    fn short_password_is_rejected() {
        let store = temp_store();
        let err = store.register("bob", "bob@example.com", "short").unwrap_err();
        assert_eq!(err.category(), "ValidationFailed");
    }
}
