//! Conversion pipeline configuration

use std::path::PathBuf;

use citeline_core::{CategoryFilter, FieldLayout};

/// Records per bulk-document shard
pub const DEFAULT_BULK_MAX_PER_SHARD: usize = 15_000;

/// Per-sink output settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    /// Build this sink at all
    pub enabled: bool,
    /// Remove the sink's output folder before the run
    pub clean: bool,
    /// Rotate to a new shard after this many records; `None` = one shard per partition
    pub max_per_shard: Option<usize>,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            clean: false,
            max_per_shard: None,
        }
    }
}

/// Runtime configuration for the conversion pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the partition files
    pub input_dir: PathBuf,
    /// Glob (relative to `input_dir`) selecting partition files
    pub pattern: String,
    /// Root output directory; each sink writes into its own folder below it
    pub output_dir: PathBuf,
    pub layout: FieldLayout,
    /// Keep only records with a category starting with this prefix
    pub category_prefix: Option<String>,
    /// Maximum partitions converted per invocation (fully skipped ones are free)
    pub max_partitions: Option<usize>,
    /// Add display-safe author/title duplicates to bulk documents
    pub audit_fields: bool,
    pub bulk: SinkSettings,
    pub flat: SinkSettings,
    pub graph: SinkSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            pattern: "*.csv".to_string(),
            output_dir: PathBuf::from("data/output"),
            layout: FieldLayout::default(),
            category_prefix: None,
            max_partitions: None,
            audit_fields: false,
            bulk: SinkSettings {
                max_per_shard: Some(DEFAULT_BULK_MAX_PER_SHARD),
                ..SinkSettings::default()
            },
            flat: SinkSettings::default(),
            graph: SinkSettings::default(),
        }
    }
}

impl Config {
    pub fn category_filter(&self) -> Option<CategoryFilter> {
        self.category_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(CategoryFilter::new)
    }

    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, settings) in [
            ("bulk", &self.bulk),
            ("flat", &self.flat),
            ("graph", &self.graph),
        ] {
            if settings.max_per_shard == Some(0) {
                anyhow::bail!("{name}: max_per_shard must be at least 1");
            }
        }
        if self.max_partitions == Some(0) {
            anyhow::bail!("max_partitions must be at least 1");
        }
        if !(self.bulk.enabled || self.flat.enabled || self.graph.enabled) {
            anyhow::bail!("no sinks enabled");
        }
        Ok(())
    }
}
