//! Citeline Core - Common infrastructure for citation record pipelines
//!
//! This crate provides the pieces every conversion and loading stage shares:
//! field normalization, the streaming record reader, the normalized record
//! type, and logging/progress plumbing.

pub mod error;
pub mod logging;
pub mod normalize;
pub mod progress;
pub mod reader;
pub mod record;
pub mod vocabulary;

// Re-exports for convenience
pub use error::ConvertError;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use reader::{CategoryFilter, FieldLayout, RawRecord, RecordReader, open_partition};
pub use record::Record;
pub use vocabulary::Vocabulary;
