//! Shard lifecycle: naming, rotation, skip-if-exists and commit-on-close
//!
//! Shards are named `{partition}_{index}.{ext}` with the index starting at 1.
//! Every shard is written as `{name}.tmp` and renamed when its partition
//! closes, so a committed first shard means the whole partition finished.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use citeline_core::{ConvertError, Record};

use crate::config::SinkSettings;
use crate::sink::{
    FinalizeContext, FinalizeOutcome, Sink, WRITE_BUF_SIZE, cleanup_tmp_files, tmp_path_for,
};

/// Counters for one sink across the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardStats {
    pub shards_written: usize,
    pub records_written: usize,
    pub partitions_written: usize,
    /// Partitions left alone because their first shard already existed
    pub partitions_skipped: Vec<String>,
}

#[derive(Debug)]
struct ActivePartition {
    partition: String,
    index: usize,
    /// Records in the currently open shard
    count: usize,
    /// (tmp, final) for every shard opened in this partition
    pending: Vec<(PathBuf, PathBuf)>,
}

#[derive(Debug)]
enum State {
    Idle,
    Active(ActivePartition),
    Skipping,
}

/// Drives one [`Sink`] through partitions and shards.
pub struct ShardManager {
    sink: Box<dyn Sink>,
    dir: PathBuf,
    max_per_shard: Option<usize>,
    state: State,
    stats: ShardStats,
}

impl std::fmt::Debug for ShardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardManager")
            .field("sink", &self.sink.name())
            .field("dir", &self.dir)
            .field("max_per_shard", &self.max_per_shard)
            .field("state", &self.state)
            .finish()
    }
}

pub fn shard_path(dir: &Path, partition: &str, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("{partition}_{index}.{extension}"))
}

impl ShardManager {
    /// Prepare `{output_root}/{sink name}`: optionally wipe it, create it and
    /// drop stale tmp files from an interrupted run.
    pub fn new(
        sink: Box<dyn Sink>,
        output_root: &Path,
        settings: &SinkSettings,
    ) -> Result<Self, ConvertError> {
        let dir = output_root.join(sink.name());
        if settings.clean && dir.exists() {
            log::info!("{}: cleaning {}", sink.name(), dir.display());
            fs::remove_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| ConvertError::io(&dir, e))?;
        cleanup_tmp_files(&dir).map_err(|e| ConvertError::io(&dir, e))?;

        Ok(Self {
            sink,
            dir,
            max_per_shard: settings.max_per_shard,
            state: State::Idle,
            stats: ShardStats::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.sink.name()
    }

    pub fn stats(&self) -> &ShardStats {
        &self.stats
    }

    pub fn shard_path(&self, partition: &str, index: usize) -> PathBuf {
        shard_path(&self.dir, partition, index, self.sink.extension())
    }

    /// Whether `partition_opened` would skip this partition.
    pub fn will_skip(&self, partition: &str) -> bool {
        self.shard_path(partition, 1).exists()
    }

    pub fn is_skipping(&self) -> bool {
        matches!(self.state, State::Skipping)
    }

    pub fn skipped_any(&self) -> bool {
        !self.stats.partitions_skipped.is_empty()
    }

    pub fn partition_opened(&mut self, partition: &str) -> Result<(), ConvertError> {
        assert!(
            matches!(self.state, State::Idle),
            "{}: partition {partition} opened while another is open",
            self.name()
        );

        if self.will_skip(partition) {
            log::info!("{}: {partition} already converted, skipping", self.name());
            self.stats.partitions_skipped.push(partition.to_string());
            self.state = State::Skipping;
            return Ok(());
        }

        let mut active = ActivePartition {
            partition: partition.to_string(),
            index: 1,
            count: 0,
            pending: Vec::new(),
        };
        open_shard(self.sink.as_mut(), &self.dir, &mut active)?;
        self.state = State::Active(active);
        Ok(())
    }

    pub fn accept(&mut self, record: &Record) -> Result<(), ConvertError> {
        let active = match &mut self.state {
            State::Active(active) => active,
            State::Skipping => return Ok(()),
            State::Idle => panic!("{}: record routed with no open partition", self.sink.name()),
        };

        if self.max_per_shard.is_some_and(|max| active.count >= max) {
            close_shard(self.sink.as_mut(), active)?;
            active.index += 1;
            open_shard(self.sink.as_mut(), &self.dir, active)?;
        }

        self.sink
            .accept_record(record)
            .map_err(|e| ConvertError::io(current_tmp(active), e))?;
        active.count += 1;
        self.stats.records_written += 1;
        Ok(())
    }

    /// Close the last shard and commit the partition.
    ///
    /// Renames run last shard first, so shard 1 (the resume marker) only
    /// appears once every other shard of the partition is in place.
    pub fn partition_closed(&mut self) -> Result<(), ConvertError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Active(mut active) => {
                close_shard(self.sink.as_mut(), &active)?;
                for (tmp, path) in active.pending.drain(..).rev() {
                    fs::rename(&tmp, &path).map_err(|e| ConvertError::io(&path, e))?;
                    self.stats.shards_written += 1;
                }
                self.stats.partitions_written += 1;
                log::debug!(
                    "{}: {} committed in {} shard(s)",
                    self.name(),
                    active.partition,
                    active.index
                );
                Ok(())
            }
            State::Skipping => Ok(()),
            State::Idle => panic!("{}: partition closed while none is open", self.name()),
        }
    }

    /// Abandon the open partition after an error: release the shard handle
    /// and remove its uncommitted files.
    pub fn abort(&mut self) {
        if let State::Active(active) = std::mem::replace(&mut self.state, State::Idle) {
            if let Err(e) = self.sink.close_shard() {
                log::debug!("{}: closing aborted shard: {e}", self.name());
            }
            for (tmp, _) in &active.pending {
                if let Err(e) = fs::remove_file(tmp) {
                    log::warn!("{}: could not remove {}: {e}", self.name(), tmp.display());
                }
            }
        }
    }

    pub fn finalize(&mut self) -> Result<FinalizeOutcome, ConvertError> {
        assert!(
            matches!(self.state, State::Idle),
            "{}: finalize called with an open partition",
            self.name()
        );
        let ctx = FinalizeContext {
            output_dir: &self.dir,
            skipped_partitions: &self.stats.partitions_skipped,
        };
        self.sink
            .finalize(&ctx)
            .map_err(|e| ConvertError::io(&self.dir, e))
    }
}

fn current_tmp(active: &ActivePartition) -> &Path {
    active
        .pending
        .last()
        .map(|(tmp, _)| tmp.as_path())
        .unwrap_or(Path::new(""))
}

fn open_shard(
    sink: &mut dyn Sink,
    dir: &Path,
    active: &mut ActivePartition,
) -> Result<(), ConvertError> {
    let path = shard_path(dir, &active.partition, active.index, sink.extension());
    let tmp = tmp_path_for(&path);
    let file = File::create(&tmp).map_err(|e| ConvertError::io(&tmp, e))?;
    sink.open_shard(BufWriter::with_capacity(WRITE_BUF_SIZE, file), &active.partition)
        .map_err(|e| ConvertError::io(&tmp, e))?;
    active.count = 0;
    active.pending.push((tmp, path));
    Ok(())
}

fn close_shard(sink: &mut dyn Sink, active: &ActivePartition) -> Result<(), ConvertError> {
    sink.close_shard()
        .map_err(|e| ConvertError::io(current_tmp(active), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ShardFile, open_shard_mut};
    use std::io::{self, Write};
    use tempfile::TempDir;

    /// One id per line
    #[derive(Default)]
    struct LineSink {
        out: Option<ShardFile>,
    }

    impl Sink for LineSink {
        fn name(&self) -> &'static str {
            "lines"
        }
        fn extension(&self) -> &'static str {
            "txt"
        }
        fn open_shard(&mut self, out: ShardFile, _partition: &str) -> io::Result<()> {
            self.out = Some(out);
            Ok(())
        }
        fn accept_record(&mut self, record: &Record) -> io::Result<()> {
            writeln!(open_shard_mut(&mut self.out, "lines"), "{}", record.id)
        }
        fn close_shard(&mut self) -> io::Result<()> {
            let mut out = self.out.take().expect("close without open");
            out.flush()
        }
    }

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            authors: String::new(),
            title: String::new(),
            display_authors: String::new(),
            display_title: String::new(),
            references: Vec::new(),
        }
    }

    fn manager(root: &Path, max: Option<usize>) -> ShardManager {
        let settings = SinkSettings {
            max_per_shard: max,
            ..SinkSettings::default()
        };
        ShardManager::new(Box::new(LineSink::default()), root, &settings).unwrap()
    }

    fn run_partition(m: &mut ShardManager, partition: &str, n: usize) {
        m.partition_opened(partition).unwrap();
        for i in 0..n {
            m.accept(&record(&format!("r{i}"))).unwrap();
        }
        m.partition_closed().unwrap();
    }

    #[test]
    fn rotation_produces_ceil_shards() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), Some(3));
        run_partition(&mut m, "2020", 7);

        assert_eq!(m.stats().shards_written, 3);
        let out = dir.path().join("lines");
        assert_eq!(fs::read_to_string(out.join("2020_1.txt")).unwrap(), "r0\nr1\nr2\n");
        assert_eq!(fs::read_to_string(out.join("2020_3.txt")).unwrap(), "r6\n");
        assert!(!out.join("2020_4.txt").exists());
    }

    #[test]
    fn exact_multiple_does_not_open_empty_shard() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), Some(2));
        run_partition(&mut m, "2020", 4);
        assert_eq!(m.stats().shards_written, 2);
        assert!(!dir.path().join("lines/2020_3.txt").exists());
    }

    #[test]
    fn empty_partition_writes_one_shard() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), Some(2));
        run_partition(&mut m, "2020", 0);
        assert_eq!(m.stats().shards_written, 1);
        assert!(dir.path().join("lines/2020_1.txt").exists());
    }

    #[test]
    fn existing_first_shard_skips_partition() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), None);
        run_partition(&mut m, "2020", 2);
        drop(m);

        let mut m = manager(dir.path(), None);
        assert!(m.will_skip("2020"));
        m.partition_opened("2020").unwrap();
        assert!(m.is_skipping());
        m.accept(&record("ignored")).unwrap();
        m.partition_closed().unwrap();

        assert!(m.skipped_any());
        assert_eq!(m.stats().records_written, 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("lines/2020_1.txt")).unwrap(),
            "r0\nr1\n"
        );
    }

    #[test]
    fn shards_invisible_until_partition_closes() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), Some(1));
        m.partition_opened("2020").unwrap();
        m.accept(&record("a")).unwrap();
        m.accept(&record("b")).unwrap();

        assert!(!m.will_skip("2020"));
        assert!(dir.path().join("lines/2020_1.txt.tmp").exists());

        m.partition_closed().unwrap();
        assert!(m.will_skip("2020"));
        assert!(!dir.path().join("lines/2020_2.txt.tmp").exists());
    }

    #[test]
    fn abort_removes_uncommitted_shards() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), Some(1));
        m.partition_opened("2020").unwrap();
        m.accept(&record("a")).unwrap();
        m.accept(&record("b")).unwrap();
        m.abort();

        let left: Vec<_> = fs::read_dir(dir.path().join("lines")).unwrap().collect();
        assert!(left.is_empty());
        assert!(!m.will_skip("2020"));
    }

    #[test]
    fn stale_tmp_removed_on_start() {
        let dir = TempDir::new().unwrap();
        let sink_dir = dir.path().join("lines");
        fs::create_dir_all(&sink_dir).unwrap();
        fs::write(sink_dir.join("2020_1.txt.tmp"), "partial").unwrap();

        let m = manager(dir.path(), None);
        assert!(!sink_dir.join("2020_1.txt.tmp").exists());
        assert!(!m.will_skip("2020"));
    }

    #[test]
    fn clean_wipes_sink_folder() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), None);
        run_partition(&mut m, "2020", 1);
        drop(m);

        let settings = SinkSettings {
            clean: true,
            ..SinkSettings::default()
        };
        let m = ShardManager::new(Box::new(LineSink::default()), dir.path(), &settings).unwrap();
        assert!(!m.will_skip("2020"));
    }

    #[test]
    #[should_panic(expected = "no open partition")]
    fn accept_without_partition_panics() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(dir.path(), None);
        let _ = m.accept(&record("a"));
    }
}
