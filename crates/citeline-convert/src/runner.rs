//! Main runner: partitions in descending order, one pass, every sink

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use citeline_core::progress::UPDATE_INTERVAL;
use citeline_core::{
    CategoryFilter, FieldLayout, ProgressContext, Record, RecordReader, Vocabulary, fmt_num,
    open_partition,
};

use crate::bulk::BulkDocumentSink;
use crate::config::Config;
use crate::flat::FlatRowSink;
use crate::graph::GraphEdgeSink;
use crate::partition::{Partition, discover_partitions};
use crate::shard::{ShardManager, ShardStats};
use crate::sink::{FinalizeOutcome, Sink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionStatus {
    Converted { records: usize, rejected: usize },
    /// Every sink already had this partition; the file was not read
    Skipped,
}

#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub key: String,
    pub status: PartitionStatus,
}

#[derive(Debug, Clone)]
pub struct SinkSummary {
    pub name: &'static str,
    pub stats: ShardStats,
    pub finalize: FinalizeOutcome,
}

/// Pipeline execution summary
#[derive(Debug)]
pub struct RunSummary {
    pub partitions: Vec<PartitionSummary>,
    pub total_records: usize,
    pub rejected_records: usize,
    pub vocabulary_size: usize,
    pub sinks: Vec<SinkSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn converted_partitions(&self) -> usize {
        self.partitions
            .iter()
            .filter(|p| matches!(p.status, PartitionStatus::Converted { .. }))
            .count()
    }

    pub fn sink(&self, name: &str) -> Option<&SinkSummary> {
        self.sinks.iter().find(|s| s.name == name)
    }
}

/// Build a shard manager for every enabled sink, in bulk, flat, graph order.
pub fn build_managers(config: &Config) -> Result<Vec<ShardManager>> {
    let mut sinks: Vec<(Box<dyn Sink>, &crate::config::SinkSettings)> = Vec::new();
    if config.bulk.enabled {
        sinks.push((Box::new(BulkDocumentSink::new(config.audit_fields)), &config.bulk));
    }
    if config.flat.enabled {
        sinks.push((Box::new(FlatRowSink::new()), &config.flat));
    }
    if config.graph.enabled {
        sinks.push((Box::new(GraphEdgeSink::new()), &config.graph));
    }

    sinks
        .into_iter()
        .map(|(sink, settings)| {
            let name = sink.name();
            ShardManager::new(sink, &config.output_dir, settings)
                .with_context(|| format!("Failed to prepare {name} output"))
        })
        .collect()
}

/// Run the conversion over every partition under `config.input_dir`
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary> {
    config.validate()?;

    let partitions = discover_partitions(&config.input_dir, &config.pattern)?;
    log::info!(
        "Found {} partition(s) in {}",
        partitions.len(),
        config.input_dir.display()
    );
    if partitions.is_empty() {
        log::warn!("No input files match {}", config.pattern);
    }

    run_partitions(config, &partitions, progress)
}

/// Run the conversion over an explicit, already ordered partition list
pub fn run_partitions(
    config: &Config,
    partitions: &[Partition],
    progress: &ProgressContext,
) -> Result<RunSummary> {
    let start = Instant::now();
    config.validate()?;

    let mut managers = build_managers(config)?;
    let filter = config.category_filter();
    let mut vocabulary = Vocabulary::new();
    let mut summaries = Vec::new();
    let mut converted = 0;

    for partition in partitions {
        if let Some(max) = config.max_partitions {
            if converted >= max {
                log::info!("Reached max_partitions ({max}), stopping");
                break;
            }
        }

        let status = convert_partition(
            partition,
            &mut managers,
            &config.layout,
            filter.as_ref(),
            &mut vocabulary,
            progress,
        )
        .with_context(|| format!("Failed to convert partition {}", partition.key))?;

        if matches!(status, PartitionStatus::Converted { .. }) {
            converted += 1;
        }
        summaries.push(PartitionSummary {
            key: partition.key.clone(),
            status,
        });
    }

    let mut sinks = Vec::with_capacity(managers.len());
    for manager in &mut managers {
        let finalize = manager
            .finalize()
            .with_context(|| format!("Failed to finalize {}", manager.name()))?;
        sinks.push(SinkSummary {
            name: manager.name(),
            stats: manager.stats().clone(),
            finalize,
        });
    }

    let (total_records, rejected_records) =
        summaries
            .iter()
            .fold((0, 0), |(total, rej), p| match p.status {
                PartitionStatus::Converted { records, rejected } => {
                    (total + records, rej + rejected)
                }
                PartitionStatus::Skipped => (total, rej),
            });

    let summary = RunSummary {
        partitions: summaries,
        total_records,
        rejected_records,
        vocabulary_size: vocabulary.len(),
        sinks,
        elapsed: start.elapsed(),
    };

    log_summary(&summary);
    Ok(summary)
}

fn convert_partition(
    partition: &Partition,
    managers: &mut [ShardManager],
    layout: &FieldLayout,
    filter: Option<&CategoryFilter>,
    vocabulary: &mut Vocabulary,
    progress: &ProgressContext,
) -> Result<PartitionStatus> {
    for i in 0..managers.len() {
        if let Err(e) = managers[i].partition_opened(&partition.key) {
            abort_all(managers);
            return Err(e.into());
        }
    }

    let status = if managers.iter().all(ShardManager::is_skipping) {
        log::info!("{}: every sink has it already, not reading", partition.key);
        PartitionStatus::Skipped
    } else {
        match stream_partition(partition, managers, layout, filter, vocabulary, progress) {
            Ok(status) => status,
            Err(e) => {
                abort_all(managers);
                return Err(e);
            }
        }
    };

    for i in 0..managers.len() {
        if let Err(e) = managers[i].partition_closed() {
            abort_all(managers);
            return Err(e.into());
        }
    }
    Ok(status)
}

/// Drop uncommitted shards of every manager still inside a partition
fn abort_all(managers: &mut [ShardManager]) {
    for manager in managers.iter_mut() {
        manager.abort();
    }
}

fn stream_partition(
    partition: &Partition,
    managers: &mut [ShardManager],
    layout: &FieldLayout,
    filter: Option<&CategoryFilter>,
    vocabulary: &mut Vocabulary,
    progress: &ProgressContext,
) -> Result<PartitionStatus> {
    log::info!(
        "Converting {} ({})...",
        partition.key,
        partition.path.display()
    );

    let input = open_partition(&partition.path)?;
    let mut reader = RecordReader::new(input, &partition.key)
        .with_layout(*layout)
        .with_filter(filter.cloned())
        .with_origin(&partition.path);

    let pb = progress.spinner(&partition.key);
    let mut records = 0usize;

    for raw in reader.by_ref() {
        let raw = raw?;
        let record = Record::from_raw(&raw, layout);
        vocabulary.observe(&record);
        for manager in managers.iter_mut() {
            manager.accept(&record)?;
        }
        records += 1;
        if records % UPDATE_INTERVAL == 0 {
            pb.set_message(format!("{} records", fmt_num(records)));
        }
    }
    pb.finish_and_clear();

    let rejected = reader.rejected();
    log::info!(
        "{}: {} records ({} filtered out), vocabulary {}",
        partition.key,
        fmt_num(records),
        fmt_num(rejected),
        fmt_num(vocabulary.len())
    );

    Ok(PartitionStatus::Converted { records, rejected })
}

fn log_summary(summary: &RunSummary) {
    let skipped = summary.partitions.len() - summary.converted_partitions();
    log::info!("=== Conversion Summary ===");
    log::info!(
        "Partitions: {} converted, {} skipped",
        summary.converted_partitions(),
        skipped
    );
    log::info!("Records: {}", fmt_num(summary.total_records));
    log::info!("Vocabulary: {} words", fmt_num(summary.vocabulary_size));
    for sink in &summary.sinks {
        log::info!(
            "{}: {} shard(s), {} record(s)",
            sink.name,
            sink.stats.shards_written,
            fmt_num(sink.stats.records_written)
        );
    }
    log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    if summary.total_records > 0 {
        let rate = summary.total_records as f64 / summary.elapsed.as_secs_f64();
        log::info!("Throughput: {:.0} records/sec", rate);
    }
}
