//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

/// Global configuration for citeline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub bulk: SinkConfig,
    pub flat: SinkConfig,
    pub graph: SinkConfig,
    pub convert: ConvertConfig,
    pub search: SearchConfig,
    pub store: StoreConfig,
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    #[serde(deserialize_with = "deserialize_expanded")]
    pub dir: PathBuf,
    pub pattern: String,
    /// Split count per line; the last field keeps any further `;`
    pub max_splits: usize,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub category_prefix: Option<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        let convert = citeline_convert::Config::default();
        Self {
            dir: convert.input_dir,
            pattern: convert.pattern,
            max_splits: convert.layout.max_splits,
            category_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    #[serde(deserialize_with = "deserialize_expanded")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: citeline_convert::Config::default().output_dir,
        }
    }
}

/// `[bulk]`, `[flat]`, `[graph]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub enabled: bool,
    pub clean: bool,
    /// Unset: bulk rotates every 15,000 records, flat and graph never rotate
    pub max_per_shard: Option<usize>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clean: false,
            max_per_shard: None,
        }
    }
}

impl SinkConfig {
    fn settings(&self, default_max: Option<usize>) -> citeline_convert::SinkSettings {
        citeline_convert::SinkSettings {
            enabled: self.enabled,
            clean: self.clean,
            max_per_shard: self.max_per_shard.or(default_max),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub max_partitions: Option<usize>,
    pub audit_fields: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(deserialize_with = "deserialize_expanded")]
    pub url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: citeline_load::config::DEFAULT_SEARCH_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(deserialize_with = "deserialize_expanded")]
    pub path: PathBuf,
    /// Ignore `path` and keep the store in memory
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/citeline.duckdb"),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// 0 waits forever
    pub wait_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            wait_secs: citeline_load::config::DEFAULT_READINESS_WAIT.as_secs(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Like [`deserialize_env_var`] for required values; an unset variable is an error
fn deserialize_expanded<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw = String::deserialize(deserializer)?;
    expand_env_var(&raw)
        .map(T::from)
        .ok_or_else(|| serde::de::Error::custom(format!("environment variable in {raw} is not set")))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./citeline.toml (current directory)
    /// 2. ~/.config/citeline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("citeline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "citeline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn convert_config(&self) -> citeline_convert::Config {
        let defaults = citeline_convert::Config::default();
        let mut layout = defaults.layout;
        layout.max_splits = self.input.max_splits;

        citeline_convert::Config {
            input_dir: self.input.dir.clone(),
            pattern: self.input.pattern.clone(),
            output_dir: self.output.dir.clone(),
            layout,
            category_prefix: self.input.category_prefix.clone(),
            max_partitions: self.convert.max_partitions,
            audit_fields: self.convert.audit_fields,
            bulk: self.bulk.settings(defaults.bulk.max_per_shard),
            flat: self.flat.settings(defaults.flat.max_per_shard),
            graph: self.graph.settings(defaults.graph.max_per_shard),
        }
    }

    pub fn load_config(&self) -> citeline_load::LoadConfig {
        citeline_load::LoadConfig {
            output_dir: self.output.dir.clone(),
            search_url: self.search.url.clone(),
            store_path: self.store_path(),
            readiness_wait: self.readiness_wait(),
            targets: citeline_load::LoadTargets::default(),
        }
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        (!self.store.in_memory).then(|| self.store.path.clone())
    }

    pub fn readiness_wait(&self) -> Option<Duration> {
        (self.readiness.wait_secs > 0).then(|| Duration::from_secs(self.readiness.wait_secs))
    }
}
