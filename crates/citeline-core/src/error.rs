//! Common error type for partition conversion

use std::path::{Path, PathBuf};

/// Error from converting a single input partition.
///
/// Malformed input fails the partition instead of guessing missing fields.
#[derive(Debug)]
pub enum ConvertError {
    /// Local I/O failure on an input or output path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A record line had fewer fields than the layout requires.
    Malformed {
        partition: String,
        line: usize,
        found: usize,
        expected: usize,
    },
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO ({}): {source}", path.display()),
            Self::Malformed {
                partition,
                line,
                found,
                expected,
            } => write!(
                f,
                "malformed record in partition {partition} line {line}: \
                 {found} fields, expected at least {expected}"
            ),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { .. } => None,
        }
    }
}

impl ConvertError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
