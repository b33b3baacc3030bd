//! Citeline Load - push converted shards into the search, relational and
//! key/value collaborators, and read them back
//!
//! Conversion never talks to a collaborator; everything with a network or
//! database on the other side lives here.

pub mod api;
pub mod config;
pub mod http;
pub mod loader;
pub mod readiness;
pub mod search;
pub mod store;

// Re-exports
pub use api::{Catalog, PaperView};
pub use config::{LoadConfig, LoadTargets};
pub use loader::{LoadReport, LoadSummary, load_key_value, load_relational, load_search, run};
pub use readiness::wait_until_open;
pub use search::{SearchClient, SearchIndex};
pub use store::{DuckStore, KeyValueStore, RelationalStore, StoredRecord};
