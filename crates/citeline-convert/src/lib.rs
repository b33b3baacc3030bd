//! Citeline Convert - multi-sink conversion of citation record partitions
//!
//! Streams every input partition once and fans each accepted record out to
//! the configured sinks, each writing its own size-bounded, resumable shards.
//!
//! # Example
//!
//! ```ignore
//! use citeline_convert::{Config, run};
//!
//! let config = Config {
//!     input_dir: "data/input".into(),
//!     max_partitions: Some(1),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, &citeline_core::ProgressContext::hidden())?;
//! println!("Converted {} records", summary.total_records);
//! ```

pub mod bulk;
pub mod config;
pub mod flat;
pub mod graph;
pub mod partition;
pub mod runner;
pub mod shard;
pub mod sink;

// Re-exports
pub use config::{Config, SinkSettings};
pub use partition::{Partition, discover_partitions};
pub use runner::{PartitionStatus, RunSummary, SinkSummary, run};
pub use sink::{FinalizeOutcome, Sink};
