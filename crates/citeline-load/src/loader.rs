//! Push converted shards into the collaborators

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use citeline_convert::graph::{PAPERS_FILE, SCHEMA_FILE};

use crate::config::LoadConfig;
use crate::readiness::{host_port, wait_until_open};
use crate::search::{SearchClient, SearchIndex};
use crate::store::{DuckStore, KeyValueStore, RelationalStore, StoredRecord};

/// Counts for one collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub shards: usize,
    pub records: usize,
}

/// Result of [`run`]; `None` for targets that were not loaded
#[derive(Debug, Default)]
pub struct LoadReport {
    pub search: Option<LoadSummary>,
    pub relational: Option<LoadSummary>,
    pub key_value: Option<LoadSummary>,
    pub elapsed: Duration,
}

/// Committed shards in `dir` with the given extension, sorted by file name.
///
/// Finalize artifacts share the folder with edge shards and are left out.
pub fn shard_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(format!("*.{extension}"));
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid shard pattern: {pattern}"))?
        .filter_map(Result::ok)
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n != SCHEMA_FILE && n != PAPERS_FILE)
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn read_shard(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Scripts holding nothing but comments are not sent to the database.
fn has_statements(sql: &str) -> bool {
    sql.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with("--")
    })
}

/// Bulk-push every bulk-document shard to the search index.
pub fn load_search(index: &dyn SearchIndex, bulk_dir: &Path) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    for path in shard_files(bulk_dir, "json")? {
        let body = read_shard(&path)?;
        let entries: Vec<serde::de::IgnoredAny> = serde_json::from_str(&body)
            .with_context(|| format!("{} is not a JSON array", path.display()))?;

        index
            .bulk_put(body)
            .with_context(|| format!("Failed to index {}", path.display()))?;
        log::debug!("search: {} ({} documents)", path.display(), entries.len());

        summary.shards += 1;
        summary.records += entries.len();
    }
    Ok(summary)
}

/// Reset the schema, insert the identifier universe, then every edge shard
/// in name order.
pub fn load_relational(store: &dyn RelationalStore, graph_dir: &Path) -> Result<LoadSummary> {
    let schema = graph_dir.join(SCHEMA_FILE);
    let papers = graph_dir.join(PAPERS_FILE);
    if !schema.exists() || !papers.exists() {
        anyhow::bail!(
            "{} has no {SCHEMA_FILE}/{PAPERS_FILE}; convert with no skipped partitions first",
            graph_dir.display()
        );
    }

    store
        .execute_script(&read_shard(&schema)?)
        .context("Failed to reset relational schema")?;

    let papers_sql = read_shard(&papers)?;
    if has_statements(&papers_sql) {
        store
            .execute_script(&papers_sql)
            .context("Failed to insert identifier universe")?;
    }

    let mut summary = LoadSummary::default();
    for path in shard_files(graph_dir, "sql")? {
        let sql = read_shard(&path)?;
        if has_statements(&sql) {
            store
                .execute_script(&sql)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
        summary.shards += 1;
        summary.records += sql.lines().filter(|l| l.trim_start().starts_with("('")).count();
    }
    Ok(summary)
}

/// Store every flat row under its identifier.
pub fn load_key_value(store: &dyn KeyValueStore, flat_dir: &Path) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();
    for path in shard_files(flat_dir, "csv")? {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        for row in reader.deserialize::<StoredRecord>() {
            let record = row.with_context(|| format!("Bad row in {}", path.display()))?;
            store.put_record(&record)?;
            summary.records += 1;
        }
        summary.shards += 1;
    }
    Ok(summary)
}

fn log_summary(target: &str, summary: &LoadSummary) {
    log::info!(
        "{target}: {} shard(s), {} row(s)",
        summary.shards,
        summary.records
    );
}

/// Load every enabled target from `config.output_dir`
pub fn run(config: &LoadConfig) -> Result<LoadReport> {
    let start = Instant::now();
    let mut report = LoadReport::default();

    if config.targets.search {
        let (host, port) = host_port(&config.search_url)?;
        wait_until_open(&host, port, config.readiness_wait)?;
        let client = SearchClient::new(&config.search_url);
        let summary = load_search(&client, &config.output_dir.join("bulk"))?;
        log_summary("search", &summary);
        report.search = Some(summary);
    }

    if config.targets.relational || config.targets.key_value {
        let store = DuckStore::open_or_memory(config.store_path.as_deref())?;

        if config.targets.relational {
            let summary = load_relational(&store, &config.output_dir.join("graph"))?;
            log_summary("relational", &summary);
            report.relational = Some(summary);
        }
        if config.targets.key_value {
            let summary = load_key_value(&store, &config.output_dir.join("flat"))?;
            log_summary("key/value", &summary);
            report.key_value = Some(summary);
        }
    }

    report.elapsed = start.elapsed();
    log::info!("Load finished in {:.1}s", report.elapsed.as_secs_f64());
    Ok(report)
}
