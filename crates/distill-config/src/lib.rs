//! # distill-config
//!
//! Layered configuration for the distill pipeline.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`DISTILL_*` prefix, `__` as section separator)
//! 2. `distill.toml` in the working directory
//! 3. `~/.config/distill/config.toml`
//! 4. Built-in defaults
//!
//! `DISTILL_SEARCH__SEARXNG_URL` maps to `search.searxng_url`,
//! `DISTILL_INFERENCE__MODEL` to `inference.model`, and so on.
//!
//! ```no_run
//! use distill_config::DistillConfig;
//!
//! let config = DistillConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! println!("store at {}", config.database.path);
//! ```

mod database;
mod error;
mod inference;
mod queue;
mod search;
mod worker;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use inference::InferenceConfig;
pub use queue::QueueConfig;
pub use search::SearchConfig;
pub use worker::WorkerConfig;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// File name of the project-local config.
pub const LOCAL_CONFIG_FILE: &str = "distill.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DistillConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl DistillConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does not read `.env`; see [`Self::load_with_dotenv`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load `.env` from the working directory (if present), then [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the provider chain. Public so tests can layer extra providers.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("DISTILL_").split("__"))
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::invalid("database.path", "must not be empty"));
        }
        if self.queue.search_queue.trim().is_empty() {
            return Err(ConfigError::invalid("queue.search_queue", "must not be empty"));
        }
        if self.queue.analysis_queue.trim().is_empty() {
            return Err(ConfigError::invalid("queue.analysis_queue", "must not be empty"));
        }
        if self.queue.search_queue == self.queue.analysis_queue {
            return Err(ConfigError::invalid(
                "queue.analysis_queue",
                "must differ from queue.search_queue",
            ));
        }
        if self.queue.visibility_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "queue.visibility_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::invalid("search.max_results", "must be at least 1"));
        }
        if !self.search.searxng_url.starts_with("http://")
            && !self.search.searxng_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "search.searxng_url",
                format!("'{}' is not an http(s) URL", self.search.searxng_url),
            ));
        }
        if !self.inference.base_url.starts_with("http://")
            && !self.inference.base_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "inference.base_url",
                format!("'{}' is not an http(s) URL", self.inference.base_url),
            ));
        }
        if self.inference.map_chunk_tokens == 0 {
            return Err(ConfigError::invalid(
                "inference.map_chunk_tokens",
                "must be at least 1",
            ));
        }
        if self.inference.has_model_override()
            && self.inference.max_model_len <= self.inference.reserved_tokens
        {
            return Err(ConfigError::invalid(
                "inference.max_model_len",
                format!(
                    "{} leaves no room for context after {} reserved tokens",
                    self.inference.max_model_len, self.inference.reserved_tokens
                ),
            ));
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("distill").join("config.toml"))
    }
}
