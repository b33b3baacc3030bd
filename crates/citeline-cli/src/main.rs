//! citeline - convert citation record dumps and serve them back
//!
//! Converts semicolon-delimited bibliographic partitions into search bulk
//! documents, flat key/value rows and citation-graph SQL, loads them into the
//! collaborators, and answers lookups against the loaded data.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::{Config, SinkConfig};

#[derive(Parser)]
#[command(name = "citeline")]
#[command(about = "Convert, load and query citation record dumps")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./citeline.toml or ~/.config/citeline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert input partitions into bulk, flat and graph shards
    Convert(cmd::convert::ConvertArgs),
    /// Load converted shards into search, relational and key/value stores
    Load(cmd::load::LoadArgs),
    /// Show one paper with its inbound reference count
    Paper(cmd::query::PaperArgs),
    /// Free-text search, hits resolved to stored papers
    Search(cmd::query::SearchArgs),
    /// Papers citing the given one
    References(cmd::query::PaperArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(citeline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  - spinners show activity
    //   non-TTY: info unless --debug          - logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    citeline_core::init_logging(quiet, cli.debug, multi)?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Convert(args) => cmd::convert::run(args, &config, &progress),
        Command::Load(args) => cmd::load::run(args, &config),
        Command::Paper(args) => cmd::query::paper(args, &config),
        Command::Search(args) => cmd::query::search(args, &config),
        Command::References(args) => cmd::query::references(args, &config),
        Command::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

    let sink = |s: &SinkConfig, default_max: &str| {
        let max = s
            .max_per_shard
            .map_or_else(|| default_max.to_string(), citeline_core::fmt_num);
        format!(
            "{}, max/shard {max}{}",
            if s.enabled { "enabled" } else { "disabled" },
            if s.clean { ", clean" } else { "" }
        )
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Input".to_string(),
        format!(
            "{} ({})",
            config.input.dir.join(&config.input.pattern).display(),
            if config.input.pattern.ends_with(".gz") {
                "gzip"
            } else {
                "plain"
            }
        ),
    ]);
    table.add_row(vec![
        "Max splits".to_string(),
        config.input.max_splits.to_string(),
    ]);
    table.add_row(vec![
        "Category prefix".to_string(),
        config
            .input
            .category_prefix
            .clone()
            .unwrap_or_else(|| "(all)".to_string()),
    ]);
    table.add_row(vec![
        "Output directory".to_string(),
        config.output.dir.display().to_string(),
    ]);
    table.add_row(vec!["Bulk".to_string(), sink(&config.bulk, "15,000")]);
    table.add_row(vec!["Flat".to_string(), sink(&config.flat, "unbounded")]);
    table.add_row(vec!["Graph".to_string(), sink(&config.graph, "unbounded")]);
    table.add_row(vec![
        "Max partitions".to_string(),
        config
            .convert
            .max_partitions
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
    ]);
    table.add_row(vec![
        "Audit fields".to_string(),
        config.convert.audit_fields.to_string(),
    ]);
    table.add_row(vec!["Search URL".to_string(), config.search.url.clone()]);
    table.add_row(vec![
        "Store".to_string(),
        config
            .store_path()
            .map_or_else(|| "in memory".to_string(), |p| p.display().to_string()),
    ]);
    table.add_row(vec![
        "Readiness wait".to_string(),
        config
            .readiness_wait()
            .map_or_else(|| "forever".to_string(), |d| format!("{}s", d.as_secs())),
    ]);

    eprintln!("\n{table}");
}
