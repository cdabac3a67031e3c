//! Typed configuration, loadable from environment variables and an
//! optional TOML file (ambient A2).
//!
//! Secrets are never stored as raw strings in a config struct; they are
//! kept as a [`SecretReference`] that is resolved lazily, mirroring the
//! teacher's `config_loader::SecretReference::from_env` convention.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A secret value, held either as a literal or as the name of an
/// environment variable to resolve it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretReference {
    Env { env: String },
    Literal(String),
}

impl SecretReference {
    #[must_use]
    pub fn from_env(var: impl Into<String>) -> Self {
        SecretReference::Env { env: var.into() }
    }

    pub fn resolve(&self) -> Result<String> {
        match self {
            SecretReference::Literal(s) => Ok(s.clone()),
            SecretReference::Env { env } => env_vars::env_string(env)
                .ok_or_else(|| Error::internal(format!("{env} environment variable must be set"))),
        }
    }
}

/// Named environment variables and a small helper for reading them.
pub mod env_vars {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const LOREKEEPER_BIND_ADDR: &str = "LOREKEEPER_BIND_ADDR";
    pub const LOREKEEPER_DATABASE_PATH: &str = "LOREKEEPER_DATABASE_PATH";
    pub const LOREKEEPER_VECTOR_INDEX_PATH: &str = "LOREKEEPER_VECTOR_INDEX_PATH";
    pub const LOREKEEPER_CONFIG_FILE: &str = "LOREKEEPER_CONFIG_FILE";

    #[must_use]
    pub fn env_string(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn env_usize(name: &str) -> Option<usize> {
        env_string(name).and_then(|v| v.parse().ok())
    }

    #[must_use]
    pub fn env_f32(name: &str) -> Option<f32> {
        env_string(name).and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_api_key")]
    pub api_key: SecretReference,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key() -> SecretReference {
    SecretReference::from_env(env_vars::OPENAI_API_KEY)
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            api_key: default_api_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_m")]
    pub m: usize,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
}

fn default_max_elements() -> usize {
    200_000
}
fn default_m() -> usize {
    16
}
fn default_ef_construction() -> usize {
    200
}

impl Default for VectorConfig {
    fn default() -> Self {
        VectorConfig {
            max_elements: default_max_elements(),
            m: default_m(),
            ef_construction: default_ef_construction(),
        }
    }
}

/// The hybrid-retriever score fusion weights (§4.9), kept as the single
/// configuration point the spec requires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_weight")]
    pub alpha_lexical: f32,
    #[serde(default = "default_weight")]
    pub beta_vector: f32,
}

fn default_weight() -> f32 {
    0.5
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            alpha_lexical: default_weight(),
            beta_vector: default_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: i64,
}

fn default_token_ttl_seconds() -> i64 {
    60 * 60 * 24 * 30 // 30 days
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_vector_index_path")]
    pub vector_index_path: String,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upper bound on concurrently in-flight ingestions (§4.8 Concurrency).
    #[serde(default = "default_ingestion_concurrency")]
    pub ingestion_concurrency: usize,
    /// Hard per-turn timeout in seconds (§5), default five minutes.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    /// Timeout for a single transport write before a turn fails with `ClientSlow`.
    #[serde(default = "default_client_write_timeout_secs")]
    pub client_write_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_database_path() -> String {
    "lorekeeper.sqlite3".to_string()
}
fn default_vector_index_path() -> String {
    "lorekeeper.hnsw".to_string()
}
fn default_ingestion_concurrency() -> usize {
    8
}
fn default_turn_timeout_secs() -> u64 {
    300
}
fn default_client_write_timeout_secs() -> u64 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            vector_index_path: default_vector_index_path(),
            openai: OpenAiConfig::default(),
            vector: VectorConfig::default(),
            fusion: FusionConfig::default(),
            auth: AuthConfig::default(),
            ingestion_concurrency: default_ingestion_concurrency(),
            turn_timeout_secs: default_turn_timeout_secs(),
            client_write_timeout_secs: default_client_write_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from an optional TOML file (path from `LOREKEEPER_CONFIG_FILE`
    /// or passed explicitly), then apply environment variable overrides
    /// for the handful of settings operators most commonly need to flip
    /// without editing a file.
    pub fn load() -> Result<Self> {
        let mut cfg = match env_vars::env_string(env_vars::LOREKEEPER_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => AppConfig::default(),
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::internal(format!("reading config file {path:?}: {e}")))?;
        toml::from_str(&raw).map_err(|e| Error::internal(format!("parsing config file: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_vars::env_string(env_vars::LOREKEEPER_BIND_ADDR) {
            self.bind_addr = v;
        }
        if let Some(v) = env_vars::env_string(env_vars::LOREKEEPER_DATABASE_PATH) {
            self.database_path = v;
        }
        if let Some(v) = env_vars::env_string(env_vars::LOREKEEPER_VECTOR_INDEX_PATH) {
            self.vector_index_path = v;
        }
    }
}
