//! Convert subcommand - partitions to bulk, flat and graph shards

use std::path::PathBuf;

use anyhow::Result;
use citeline_convert::FinalizeOutcome;
use citeline_core::{SharedProgress, fmt_num};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Bulk,
    Flat,
    Graph,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input directory (overrides [input] dir)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output root (overrides [output] dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Glob selecting partition files inside the input directory
    #[arg(long)]
    pub pattern: Option<String>,

    /// Convert at most this many partitions (already converted ones are free)
    #[arg(short = 'n', long)]
    pub max_partitions: Option<usize>,

    /// Keep only records with a category starting with this prefix
    #[arg(long)]
    pub category_prefix: Option<String>,

    /// Only build these sinks (repeatable)
    #[arg(long, value_enum)]
    pub only: Vec<SinkKind>,

    /// Wipe each sink's output folder first
    #[arg(long)]
    pub clean: bool,

    /// Add display author/title fields to bulk documents
    #[arg(long)]
    pub audit_fields: bool,
}

pub fn run(args: ConvertArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut convert = config.convert_config();

    if let Some(input) = args.input {
        convert.input_dir = input;
    }
    if let Some(output) = args.output {
        convert.output_dir = output;
    }
    if let Some(pattern) = args.pattern {
        convert.pattern = pattern;
    }
    if args.max_partitions.is_some() {
        convert.max_partitions = args.max_partitions;
    }
    if args.category_prefix.is_some() {
        convert.category_prefix = args.category_prefix;
    }
    if !args.only.is_empty() {
        convert.bulk.enabled = args.only.contains(&SinkKind::Bulk);
        convert.flat.enabled = args.only.contains(&SinkKind::Flat);
        convert.graph.enabled = args.only.contains(&SinkKind::Graph);
    }
    if args.clean {
        convert.bulk.clean = true;
        convert.flat.clean = true;
        convert.graph.clean = true;
    }
    convert.audit_fields |= args.audit_fields;

    let summary = citeline_convert::run(&convert, progress)?;

    println!();
    println!("=== Conversion Summary ===");
    println!(
        "Partitions: {} converted, {} skipped",
        summary.converted_partitions(),
        summary.partitions.len() - summary.converted_partitions()
    );
    println!(
        "Records: {} ({} filtered out)",
        fmt_num(summary.total_records),
        fmt_num(summary.rejected_records)
    );
    println!("Vocabulary: {} words", fmt_num(summary.vocabulary_size));
    println!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Sink").fg(Color::Cyan),
            Cell::new("Shards").fg(Color::Cyan),
            Cell::new("Records").fg(Color::Cyan),
            Cell::new("Partitions skipped").fg(Color::Cyan),
            Cell::new("Finalize").fg(Color::Cyan),
        ]);
    for sink in &summary.sinks {
        let finalize = match &sink.finalize {
            FinalizeOutcome::NotApplicable => "-".to_string(),
            FinalizeOutcome::Written(paths) => format!("{} artifact(s)", paths.len()),
            FinalizeOutcome::Withheld { reason } => format!("withheld: {reason}"),
        };
        table.add_row(vec![
            sink.name.to_string(),
            sink.stats.shards_written.to_string(),
            fmt_num(sink.stats.records_written),
            sink.stats.partitions_skipped.len().to_string(),
            finalize,
        ]);
    }
    println!("{table}");

    Ok(())
}
