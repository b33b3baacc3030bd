//! Graph-edge sink: SQL inserts into a `refs` table, plus the papers
//! universe written once at the end of a complete run

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use citeline_core::Record;

use crate::sink::{FinalizeContext, FinalizeOutcome, ShardFile, Sink, open_shard_mut, write_atomic};

const NAME: &str = "graph";

/// Schema artifact, applied before any edge shard is loaded
pub const SCHEMA_FILE: &str = "create_tables.sql";

/// Identifier-universe artifact
pub const PAPERS_FILE: &str = "insert_into_papers.sql";

/// `papers` holds every id seen as referencer or referencee; `refs` holds
/// one row per citation edge.
pub const SCHEMA_SQL: &str = "\
DROP TABLE IF EXISTS refs;
DROP TABLE IF EXISTS papers;

CREATE TABLE papers (
  ID VARCHAR(64) PRIMARY KEY
);

CREATE TABLE refs (
  referencer VARCHAR(64) NOT NULL REFERENCES papers (ID),
  referencee VARCHAR(64) NOT NULL REFERENCES papers (ID),
  PRIMARY KEY (referencer, referencee)
);
";

/// Edge statements per shard; the universe is accumulated across the run.
#[derive(Debug, Default)]
pub struct GraphEdgeSink {
    out: Option<ShardFile>,
    edges_in_shard: usize,
    edges_total: usize,
    universe: BTreeSet<String>,
}

impl GraphEdgeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every id recorded so far, sorted
    pub fn universe(&self) -> &BTreeSet<String> {
        &self.universe
    }

    pub fn edges_total(&self) -> usize {
        self.edges_total
    }
}

/// Render the universe as one multi-row insert into `papers`.
pub fn render_papers_insert(universe: &BTreeSet<String>) -> String {
    if universe.is_empty() {
        return "-- no identifiers recorded\n".to_string();
    }
    let mut sql = String::from("INSERT INTO papers (ID)\nVALUES\n");
    for (i, id) in universe.iter().enumerate() {
        if i > 0 {
            sql.push_str(",\n");
        }
        let _ = write!(sql, "  ('{id}')");
    }
    sql.push_str("\nON CONFLICT DO NOTHING;\n");
    sql
}

fn remove_stale_artifacts(dir: &Path) -> io::Result<()> {
    for file in [SCHEMA_FILE, PAPERS_FILE] {
        let path = dir.join(file);
        match fs::remove_file(&path) {
            Ok(()) => log::warn!("{NAME}: removed stale {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl Sink for GraphEdgeSink {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "sql"
    }

    fn open_shard(&mut self, mut out: ShardFile, partition: &str) -> io::Result<()> {
        writeln!(out, "-- citation edges, partition {partition}")?;
        self.out = Some(out);
        self.edges_in_shard = 0;
        Ok(())
    }

    /// Records citing nothing contribute no edges and no universe entries.
    fn accept_record(&mut self, record: &Record) -> io::Result<()> {
        let out = open_shard_mut(&mut self.out, NAME);
        if record.references.is_empty() {
            return Ok(());
        }

        for referencee in &record.references {
            if self.edges_in_shard == 0 {
                out.write_all(b"INSERT INTO refs (referencer, referencee)\nVALUES\n  ")?;
            } else {
                out.write_all(b",\n  ")?;
            }
            write!(out, "('{}', '{referencee}')", record.id)?;
            self.edges_in_shard += 1;
        }
        self.edges_total += record.references.len();

        self.universe.insert(record.id.clone());
        self.universe.extend(record.references.iter().cloned());
        Ok(())
    }

    fn close_shard(&mut self) -> io::Result<()> {
        let mut out = self
            .out
            .take()
            .unwrap_or_else(|| panic!("{NAME}: close_shard with no open shard"));
        if self.edges_in_shard > 0 {
            out.write_all(b"\nON CONFLICT DO NOTHING;\n")?;
        }
        out.flush()
    }

    /// Write schema and universe, unless any partition was skipped: the
    /// universe would then miss the skipped partitions' ids and break the
    /// foreign keys of their edge shards. Artifacts from an earlier run no
    /// longer cover the shards on disk either, so they are removed.
    fn finalize(&mut self, ctx: &FinalizeContext<'_>) -> io::Result<FinalizeOutcome> {
        if !ctx.skipped_partitions.is_empty() {
            let reason = format!(
                "{} partition(s) skipped this run ({}); identifier universe would be incomplete",
                ctx.skipped_partitions.len(),
                ctx.skipped_partitions.join(", ")
            );
            log::warn!("{NAME}: not writing {SCHEMA_FILE} / {PAPERS_FILE}: {reason}");
            remove_stale_artifacts(ctx.output_dir)?;
            return Ok(FinalizeOutcome::Withheld { reason });
        }

        let schema: PathBuf = ctx.output_dir.join(SCHEMA_FILE);
        write_atomic(&schema, SCHEMA_SQL.as_bytes())?;

        let papers = ctx.output_dir.join(PAPERS_FILE);
        write_atomic(&papers, render_papers_insert(&self.universe).as_bytes())?;

        log::info!(
            "{NAME}: {} identifiers, {} edges",
            self.universe.len(),
            self.edges_total
        );
        Ok(FinalizeOutcome::Written(vec![schema, papers]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::BufWriter;
    use std::path::Path;
    use tempfile::TempDir;

    fn record(id: &str, refs: &[&str]) -> Record {
        Record {
            id: id.to_string(),
            authors: String::new(),
            title: String::new(),
            display_authors: String::new(),
            display_title: String::new(),
            references: refs.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn write_shard(sink: &mut GraphEdgeSink, dir: &Path, records: &[Record]) -> String {
        let path = dir.join("2020_1.sql");
        sink.open_shard(BufWriter::new(File::create(&path).unwrap()), "2020")
            .unwrap();
        for r in records {
            sink.accept_record(r).unwrap();
        }
        sink.close_shard().unwrap();
        fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn edges_rendered_as_one_insert() {
        let dir = TempDir::new().unwrap();
        let mut sink = GraphEdgeSink::new();
        let text = write_shard(
            &mut sink,
            dir.path(),
            &[record("a1", &["a2", "a3"]), record("a4", &[])],
        );
        assert_eq!(
            text,
            "-- citation edges, partition 2020\n\
             INSERT INTO refs (referencer, referencee)\nVALUES\n  \
             ('a1', 'a2'),\n  ('a1', 'a3')\n\
             ON CONFLICT DO NOTHING;\n"
        );
        let ids: Vec<&str> = sink.universe().iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(sink.edges_total(), 2);
    }

    #[test]
    fn shard_without_edges_is_comment_only() {
        let dir = TempDir::new().unwrap();
        let mut sink = GraphEdgeSink::new();
        let text = write_shard(&mut sink, dir.path(), &[record("b1", &[])]);
        assert_eq!(text, "-- citation edges, partition 2020\n");
        assert!(sink.universe().is_empty());
    }

    #[test]
    fn papers_insert_sorted_and_deduplicated() {
        let universe: BTreeSet<String> =
            ["a3", "a1", "a2", "a1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            render_papers_insert(&universe),
            "INSERT INTO papers (ID)\nVALUES\n  ('a1'),\n  ('a2'),\n  ('a3')\nON CONFLICT DO NOTHING;\n"
        );
        assert!(render_papers_insert(&BTreeSet::new()).starts_with("--"));
    }

    #[test]
    fn finalize_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut sink = GraphEdgeSink::new();
        write_shard(&mut sink, dir.path(), &[record("a1", &["a2"])]);

        let outcome = sink
            .finalize(&FinalizeContext {
                output_dir: dir.path(),
                skipped_partitions: &[],
            })
            .unwrap();

        let FinalizeOutcome::Written(paths) = outcome else {
            panic!("expected artifacts, got {outcome:?}");
        };
        assert_eq!(paths.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join(SCHEMA_FILE)).unwrap(),
            SCHEMA_SQL
        );
        let papers = fs::read_to_string(dir.path().join(PAPERS_FILE)).unwrap();
        assert!(papers.contains("('a1'),\n  ('a2')"));
    }

    #[test]
    fn finalize_withheld_after_skip() {
        let dir = TempDir::new().unwrap();
        let mut sink = GraphEdgeSink::new();
        let skipped = vec!["2019".to_string()];
        let outcome = sink
            .finalize(&FinalizeContext {
                output_dir: dir.path(),
                skipped_partitions: &skipped,
            })
            .unwrap();

        assert!(matches!(outcome, FinalizeOutcome::Withheld { .. }));
        assert!(!dir.path().join(SCHEMA_FILE).exists());
        assert!(!dir.path().join(PAPERS_FILE).exists());
    }

    #[test]
    fn finalize_withheld_removes_earlier_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut first = GraphEdgeSink::new();
        write_shard(&mut first, dir.path(), &[record("a1", &["a2"])]);
        first
            .finalize(&FinalizeContext {
                output_dir: dir.path(),
                skipped_partitions: &[],
            })
            .unwrap();
        assert!(dir.path().join(PAPERS_FILE).exists());

        let mut second = GraphEdgeSink::new();
        let skipped = vec!["2020".to_string()];
        let outcome = second
            .finalize(&FinalizeContext {
                output_dir: dir.path(),
                skipped_partitions: &skipped,
            })
            .unwrap();

        assert!(matches!(outcome, FinalizeOutcome::Withheld { .. }));
        assert!(!dir.path().join(SCHEMA_FILE).exists());
        assert!(!dir.path().join(PAPERS_FILE).exists());
    }
}
