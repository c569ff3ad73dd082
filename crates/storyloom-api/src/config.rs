//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use storyloom_book::DEFAULT_UPLOAD_CONCURRENCY;
use storyloom_game::application::config::{DEFAULT_SESSION_TTL, DEFAULT_SUMMARY_CHAR_BUDGET};
use storyloom_game::domain::validation::KeywordMatch;

use crate::error::AppError;

/// Typed server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string for the book store.
    pub database_url: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Base URL of the illustration service.
    pub illustrator_url: String,
    /// JSON card catalog.
    pub card_catalog_path: PathBuf,
    /// Banned-term list, one term per line.
    pub denylist_path: PathBuf,
    /// Directory published images are written to.
    pub blob_root: PathBuf,
    /// Public origin used to build image URLs.
    pub public_base_url: String,
    /// Session lifetime.
    pub session_ttl: Duration,
    /// Concurrent scene uploads during finalization.
    pub upload_concurrency: usize,
    /// Characters of story summary sent to the illustrator.
    pub summary_char_budget: usize,
    /// Keyword matching mode for prompt validation.
    pub keyword_match: KeywordMatch,
    /// Serialize read-modify-write cycles per game.
    pub serialize_session_writes: bool,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a value
    /// does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let ttl_secs: u64 = parse(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL.as_secs())?;
        let upload_concurrency: usize =
            parse(&lookup, "UPLOAD_CONCURRENCY", DEFAULT_UPLOAD_CONCURRENCY)?;
        if upload_concurrency == 0 || ttl_secs == 0 {
            return Err(AppError::Config(
                "SESSION_TTL_SECS and UPLOAD_CONCURRENCY must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 3000)?,
            illustrator_url: required("ILLUSTRATOR_URL")?,
            card_catalog_path: or_default("CARD_CATALOG_PATH", "data/cards.json").into(),
            denylist_path: or_default("DENYLIST_PATH", "data/denylist.txt").into(),
            blob_root: or_default("BLOB_ROOT", "var/blobs").into(),
            public_base_url: or_default("PUBLIC_BASE_URL", "http://localhost:3000"),
            session_ttl: Duration::from_secs(ttl_secs),
            upload_concurrency,
            summary_char_budget: parse(&lookup, "SUMMARY_CHAR_BUDGET", DEFAULT_SUMMARY_CHAR_BUDGET)?,
            keyword_match: lookup("KEYWORD_MATCH")
                .map(|v| v.parse::<KeywordMatch>())
                .transpose()
                .map_err(|e| AppError::Config(format!("KEYWORD_MATCH: {e}")))?
                .unwrap_or_default(),
            serialize_session_writes: parse(&lookup, "SERIALIZE_SESSION_WRITES", false)?,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be valid: {e}"))),
    }
}
