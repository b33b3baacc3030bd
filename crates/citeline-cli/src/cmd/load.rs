//! Load subcommand - push converted shards into the collaborators

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use citeline_load::{LoadSummary, LoadTargets};
use clap::{Args, ValueEnum};

use crate::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Search,
    Relational,
    KeyValue,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Conversion output root (overrides [output] dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Search service base URL (overrides [search] url)
    #[arg(long)]
    pub search_url: Option<String>,

    /// DuckDB file (overrides [store] path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Only load these targets (repeatable)
    #[arg(long, value_enum)]
    pub only: Vec<Target>,

    /// Seconds to wait for the search port, 0 = forever
    #[arg(long)]
    pub wait_secs: Option<u64>,
}

pub fn run(args: LoadArgs, config: &Config) -> Result<()> {
    let mut load = config.load_config();

    if let Some(output) = args.output {
        load.output_dir = output;
    }
    if let Some(url) = args.search_url {
        load.search_url = url;
    }
    if args.store.is_some() {
        load.store_path = args.store;
    }
    if let Some(secs) = args.wait_secs {
        load.readiness_wait = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if !args.only.is_empty() {
        load.targets = LoadTargets {
            search: args.only.contains(&Target::Search),
            relational: args.only.contains(&Target::Relational),
            key_value: args.only.contains(&Target::KeyValue),
        };
    }

    let report = citeline_load::run(&load)?;

    let line = |name: &str, summary: Option<LoadSummary>| {
        if let Some(s) = summary {
            println!("{name}: {} shard(s), {} row(s)", s.shards, s.records);
        }
    };

    println!();
    println!("=== Load Summary ===");
    line("Search", report.search);
    line("Relational", report.relational);
    line("Key/value", report.key_value);
    println!("Time: {:.1}s", report.elapsed.as_secs_f64());

    Ok(())
}
