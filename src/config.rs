use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeepsakeConfig {
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub retrieval: RetrievalConfig,
    pub nudges: NudgeConfig,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    /// OpenAI-compatible API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Must match the vector table dimension stamped at DB creation.
    pub embedding_dimensions: usize,
    /// Per-request timeout for every external call, in seconds.
    pub request_timeout_secs: u64,
    /// Low temperature for summarization and pattern analysis.
    pub analysis_temperature: f32,
    /// Higher temperature for nudge generation variety.
    pub nudge_temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum results returned by a semantic query.
    pub default_limit: usize,
    /// Minimum cosine similarity for a match to count as relevant.
    pub similarity_floor: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NudgeConfig {
    /// How many recent memories to include in the generation context.
    pub context_window: usize,
    /// Maximum candidates accepted from a single generation call.
    pub max_per_batch: usize,
}

impl Default for KeepsakeConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            ai: AiConfig::default(),
            retrieval: RetrievalConfig::default(),
            nudges: NudgeConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_keepsake_dir()
            .join("journal.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "KEEPSAKE_API_KEY".into(),
            chat_model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            embedding_dimensions: 1536,
            request_timeout_secs: 30,
            analysis_temperature: 0.3,
            nudge_temperature: 0.7,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            similarity_floor: 0.6,
        }
    }
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            context_window: 20,
            max_per_batch: 4,
        }
    }
}

/// Returns `~/.keepsake/`
pub fn default_keepsake_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".keepsake")
}

/// Returns the default config file path: `~/.keepsake/config.toml`
pub fn default_config_path() -> PathBuf {
    default_keepsake_dir().join("config.toml")
}

impl KeepsakeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KeepsakeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (KEEPSAKE_DB, KEEPSAKE_API_BASE, KEEPSAKE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KEEPSAKE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_API_BASE") {
            self.ai.base_url = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
