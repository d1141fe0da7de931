use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pinecone_api_key: String,
    /// Data-plane host of the vector index, e.g. `https://resumatch-abc123.svc.pinecone.io`.
    pub pinecone_index_host: String,
    pub openai_api_key: String,
    /// OpenAI-compatible API root, without the `/embeddings` suffix.
    pub openai_base_url: String,
    pub embedding_model: String,
    pub port: u16,
    pub rust_log: String,
    pub cascade: CascadeLimits,
}

/// Bounds applied to every cascade batch (ban, unban, delete cleanup).
#[derive(Debug, Clone, Copy)]
pub struct CascadeLimits {
    /// Dependent documents processed at once.
    pub concurrency: usize,
    /// Wall-clock budget for one batch. Items still pending when it elapses are reported, not awaited.
    pub deadline: Duration,
}

impl Default for CascadeLimits {
    fn default() -> Self {
        Self {
            concurrency: 4,
            deadline: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = CascadeLimits::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            pinecone_api_key: require_env("PINECONE_API_KEY")?,
            pinecone_index_host: require_env("PINECONE_INDEX_HOST")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            cascade: CascadeLimits {
                concurrency: parse_env("CASCADE_CONCURRENCY", defaults.concurrency)
                    .context("CASCADE_CONCURRENCY must be a positive integer")?
                    .max(1),
                deadline: Duration::from_secs(
                    parse_env("CASCADE_DEADLINE_SECS", defaults.deadline.as_secs())
                        .context("CASCADE_DEADLINE_SECS must be a number of seconds")?,
                ),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
