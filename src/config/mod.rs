//! Configuration management for docqa
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Collaborators receive their section explicitly; nothing reads
//! configuration from global state.

mod defaults;

pub use defaults::*;

use crate::api_backend::RETRY_BACKOFF_STEP;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text generation backend configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Web page fetching configuration
    #[serde(default)]
    pub web: WebConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend base URL
    #[serde(default = "default_api_base_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Retries after a failed request
    #[serde(default = "default_embedding_retries")]
    pub retries: usize,
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Backend base URL
    #[serde(default = "default_api_base_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of ranked chunks handed to the synthesizer
    #[serde(default = "default_query_top_k")]
    pub top_k: usize,
}

/// Web page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// User agent string
    #[serde(default = "default_web_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_web_timeout")]
    pub timeout_secs: u64,

    /// Extracted text is truncated to this many characters
    #[serde(default = "default_web_max_chars")]
    pub max_chars: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for docqa data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_api_base_url(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_embedding_timeout(),
            retries: default_embedding_retries(),
        }
    }
}

impl EmbeddingConfig {
    /// Per-attempt HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upper bound on one embed call: every attempt plus the retry backoff
    pub fn call_budget(&self) -> Duration {
        let attempts = self.retries as u32 + 1;
        self.timeout() * attempts + retry_backoff_total(self.retries)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_api_base_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        read_api_key(&self.api_key_env)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_query_top_k(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            user_agent: default_web_user_agent(),
            timeout_secs: default_web_timeout(),
            max_chars: default_web_max_chars(),
        }
    }
}

/// Sum of the linear backoff `ApiClient` sleeps between `retries` attempts
fn retry_backoff_total(retries: usize) -> Duration {
    let steps = (retries * (retries + 1) / 2) as u64;
    RETRY_BACKOFF_STEP * steps as u32
}

fn read_api_key(env_name: &str) -> Option<String> {
    if env_name.is_empty() {
        return None;
    }
    std::env::var(env_name).ok().filter(|k| !k.trim().is_empty())
}

impl Config {
    /// Get the default base directory for docqa (~/.docqa)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docqa")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("docqa.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::NotInitialized);
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("docqa.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chars == 0 {
            return Err(Error::Config("chunk.max_chars must be positive".to_string()));
        }

        if self.query.top_k == 0 {
            return Err(Error::Config("query.top_k must be positive".to_string()));
        }

        if self.embedding.timeout_secs == 0 || self.generation.timeout_secs == 0 {
            return Err(Error::Config(
                "embedding.timeout_secs and generation.timeout_secs must be positive".to_string(),
            ));
        }

        if self.web.timeout_secs == 0 {
            return Err(Error::Config("web.timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}
