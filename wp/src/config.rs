//! Worker selection configuration types and loading

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorConfig;
use crate::domain::{Strategy, Topic};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// System-wide selection defaults
    pub default: TopicSettings,

    /// Per-topic overrides keyed by topic name
    pub topics: HashMap<String, TopicOverrides>,

    /// Coordinator task tuning
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.coordinator.validate()
    }

    /// Selection settings for `topic`, falling back to the defaults
    pub fn topic_settings(&self, topic: &Topic) -> TopicSettings {
        let Some(overrides) = self.topics.get(topic.as_str()) else {
            return self.default.clone();
        };
        TopicSettings {
            strategy: overrides.strategy.unwrap_or(self.default.strategy),
            max_buffer_size: overrides.max_buffer_size.unwrap_or(self.default.max_buffer_size),
        }
    }

    /// Load configuration
    ///
    /// An explicit path must load. Otherwise `.workerpick.yml` and then
    /// `<config_dir>/workerpick/workerpick.yml` are tried; an unreadable
    /// candidate is logged and skipped. With no usable file, defaults apply.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let loaded = Self::search_paths()
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| {
                Self::load_from_file(&path)
                    .inspect_err(|e| tracing::warn!(path = %path.display(), error = %e, "Skipping config file"))
                    .ok()
            });

        Ok(loaded.unwrap_or_else(|| {
            tracing::info!("No config file found, using defaults");
            Self::default()
        }))
    }

    /// Implicit config locations, most specific first
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".workerpick.yml")];
        paths.extend(dirs::config_dir().map(|dir| dir.join("workerpick").join("workerpick.yml")));
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Resolved selection settings for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicSettings {
    /// Load-balancing policy
    pub strategy: Strategy,

    /// Sticky threshold: selections served before a re-pick is forced
    #[serde(rename = "max-buffer-size")]
    pub max_buffer_size: u64,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Random,
            max_buffer_size: 100,
        }
    }
}

/// Per-topic overrides; unset fields fall back to the defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicOverrides {
    pub strategy: Option<Strategy>,

    #[serde(rename = "max-buffer-size")]
    pub max_buffer_size: Option<u64>,
}
