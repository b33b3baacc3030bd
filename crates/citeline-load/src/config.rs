//! Loader configuration

use std::path::PathBuf;
use std::time::Duration;

/// Search service address when nothing else is configured
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:10002";

/// How long to wait for the search port before giving up
pub const DEFAULT_READINESS_WAIT: Duration = Duration::from_secs(60);

/// Which collaborators a load run feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTargets {
    pub search: bool,
    pub relational: bool,
    pub key_value: bool,
}

impl Default for LoadTargets {
    fn default() -> Self {
        Self {
            search: true,
            relational: true,
            key_value: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Conversion output root holding `bulk/`, `flat/` and `graph/`
    pub output_dir: PathBuf,
    pub search_url: String,
    /// DuckDB database file; `None` keeps the store in memory
    pub store_path: Option<PathBuf>,
    /// `None` waits forever
    pub readiness_wait: Option<Duration>,
    pub targets: LoadTargets,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/output"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            store_path: Some(PathBuf::from("data/citeline.duckdb")),
            readiness_wait: Some(DEFAULT_READINESS_WAIT),
            targets: LoadTargets::default(),
        }
    }
}
