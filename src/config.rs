//! Layered configuration for external collaborators.
//!
//! Sources are merged in precedence order (later wins): compiled-in
//! defaults, an optional TOML file, then environment variables prefixed
//! `RLM_`. Built the way `zen-config` layers `figment` providers.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Base URL and timeout for an HTTP collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service.
    pub base_url: String,
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Retry/backoff policy shared by the HTTP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial backoff in milliseconds, doubled on each retry.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single backoff interval.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
        }
    }
}

/// Embedding service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Shared service config.
    #[serde(flatten)]
    pub service: ServiceConfig,
    /// Maximum number of texts sent in a single request.
    pub batch_size: usize,
    /// Per-text byte cap applied before sending to the service.
    pub truncate_bytes: usize,
}

/// LLM chat-completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Shared service config.
    #[serde(flatten)]
    pub service: ServiceConfig,
    /// Model identifier sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens requested from the model.
    pub max_tokens: u32,
}

/// Vector store location and collection name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Path to the `SQLite` database file.
    pub db_path: PathBuf,
    /// Logical collection name (used in HNSW index file naming).
    pub collection: String,
}

/// Top-level configuration, merged from defaults, file, and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Financial data service.
    pub financial_data: ServiceConfig,
    /// Embedding service.
    pub embedding: EmbeddingConfig,
    /// LLM chat-completion service.
    pub llm: LlmConfig,
    /// Vector store location.
    pub vector_store: VectorStoreConfig,
    /// Retry/backoff policy shared by all HTTP clients.
    pub retry: RetryConfig,
    /// Maximum number of `generate_report` regeneration cycles.
    pub max_regenerations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            financial_data: ServiceConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                timeout_ms: 10_000,
            },
            embedding: EmbeddingConfig {
                service: ServiceConfig {
                    base_url: "http://127.0.0.1:8001".to_string(),
                    timeout_ms: 10_000,
                },
                batch_size: 32,
                truncate_bytes: 1024,
            },
            llm: LlmConfig {
                service: ServiceConfig {
                    base_url: "http://127.0.0.1:8002".to_string(),
                    timeout_ms: 60_000,
                },
                model: "default".to_string(),
                temperature: 0.3,
                max_tokens: 2048,
            },
            vector_store: VectorStoreConfig {
                db_path: PathBuf::from("finreport.db"),
                collection: "filings".to_string(),
            },
            retry: RetryConfig::default(),
            max_regenerations: 2,
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional TOML file, then
    /// `RLM_`-prefixed environment variables, in that precedence order.
    ///
    /// `config_path` takes priority over the `RLM_CONFIG` environment
    /// variable when both are given; either may point to a nonexistent
    /// file, which is silently treated as "no file layer".
    ///
    /// # Errors
    ///
    /// Returns an error if a present file or environment layer cannot be
    /// parsed, or if the merged configuration fails validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("RLM_CONFIG").ok().map(PathBuf::from));

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = &file_path
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("RLM_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants not expressible via `serde` alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.batch_size".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.max_attempts".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm.temperature".to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_with_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.financial_data.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.max_regenerations, 2);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            max_regenerations = 5

            [financial_data]
            base_url = "https://data.example.com"
            timeout_ms = 5000
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_regenerations, 5);
        assert_eq!(config.financial_data.base_url, "https://data.example.com");
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.embedding.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());
    }
}
