/// Configuration system for doc-history
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, HistoryError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Batch scheduling configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Tracked file discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Document decoding configuration
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    /// Number of consecutive commits processed per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Tracked paths processed concurrently within one commit
    #[serde(default = "default_file_concurrency")]
    pub file_concurrency: usize,

    /// Maximum number of commits read from the log
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,

    /// Wall-clock budget for a CLI run in seconds (0 disables it)
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

/// Tracked file discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// File name suffix identifying tracked documents
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Directory names whose contents are never read
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

/// Document decoding configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderConfig {
    /// Suffix of the archive entry holding the document XML
    #[serde(default = "default_content_part_suffix")]
    pub content_part_suffix: String,

    /// Characters of raw XML returned when no text fragment is found
    #[serde(default = "default_fallback_chars")]
    pub fallback_chars: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_file_concurrency() -> usize {
    4
}

fn default_max_commits() -> usize {
    10_000
}

fn default_deadline_secs() -> u64 {
    300
}

fn default_extension() -> String {
    ".ulyz".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    vec![
        "Archive".to_string(),
        "Private".to_string(),
        ".automation".to_string(),
    ]
}

fn default_content_part_suffix() -> String {
    "Content.xml".to_string()
}

fn default_fallback_chars() -> usize {
    1000
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            file_concurrency: default_file_concurrency(),
            max_commits: default_max_commits(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            excluded_dirs: default_excluded_dirs(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            content_part_suffix: default_content_part_suffix(),
            fallback_chars: default_fallback_chars(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, HistoryError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, HistoryError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), HistoryError> {
        let positive = [
            ("extraction.batch_size", self.extraction.batch_size),
            ("extraction.file_concurrency", self.extraction.file_concurrency),
            ("extraction.max_commits", self.extraction.max_commits),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
        }

        if self.discovery.extension.is_empty() {
            return Err(invalid("discovery.extension", "must not be empty"));
        }

        if self.discovery.excluded_dirs.iter().any(|d| d.is_empty() || d.contains('/')) {
            return Err(invalid(
                "discovery.excluded_dirs",
                "entries must be non-empty directory names without '/'",
            ));
        }

        if self.decoder.content_part_suffix.is_empty() {
            return Err(invalid("decoder.content_part_suffix", "must not be empty"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("DOC_HISTORY_BATCH_SIZE")
            && let Ok(size) = value.parse()
        {
            self.extraction.batch_size = size;
        }

        if let Ok(value) = std::env::var("DOC_HISTORY_FILE_CONCURRENCY")
            && let Ok(width) = value.parse()
        {
            self.extraction.file_concurrency = width;
        }

        if let Ok(value) = std::env::var("DOC_HISTORY_MAX_COMMITS")
            && let Ok(max) = value.parse()
        {
            self.extraction.max_commits = max;
        }

        if let Ok(value) = std::env::var("DOC_HISTORY_DEADLINE_SECS")
            && let Ok(secs) = value.parse()
        {
            self.extraction.deadline_secs = secs;
        }

        if let Ok(extension) = std::env::var("DOC_HISTORY_EXTENSION") {
            self.discovery.extension = extension;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, HistoryError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::new`] but reading an explicit file instead of the
    /// default location
    pub fn from_file_with_env(path: &Path) -> Result<Self, HistoryError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn invalid(key: &str, reason: &str) -> HistoryError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
