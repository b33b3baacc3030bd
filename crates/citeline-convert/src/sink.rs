//! Sink abstraction shared by the bulk, flat and graph outputs

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use citeline_core::Record;

/// Buffered handle to one open shard file
pub type ShardFile = BufWriter<File>;

/// Write buffer per open shard
pub const WRITE_BUF_SIZE: usize = 256 * 1024;

/// Suffix for shards and artifacts that are not yet committed
pub const TMP_SUFFIX: &str = "tmp";

/// Passed to [`Sink::finalize`] once every partition has been processed
#[derive(Debug)]
pub struct FinalizeContext<'a> {
    /// The sink's output folder
    pub output_dir: &'a Path,
    /// Partitions this sink skipped during the run because shards existed
    pub skipped_partitions: &'a [String],
}

/// What a sink did at the end of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Sink has no end-of-run artifact
    NotApplicable,
    /// Artifacts written (final paths)
    Written(Vec<PathBuf>),
    /// Artifacts withheld; the reason is also logged
    Withheld { reason: String },
}

/// A per-record writer for one output format.
///
/// The [`ShardManager`](crate::shard::ShardManager) owns file naming,
/// rotation and resumability; a sink only knows how to frame a shard and
/// serialize records into it. Calling `accept_record` or `close_shard`
/// without an open shard is a programming error and panics.
pub trait Sink {
    /// Folder name under the output root, also used as the log prefix
    fn name(&self) -> &'static str;

    /// Shard file extension without the dot
    fn extension(&self) -> &'static str;

    /// Take ownership of a fresh shard file and write its header.
    fn open_shard(&mut self, out: ShardFile, partition: &str) -> io::Result<()>;

    /// Append one record to the open shard.
    fn accept_record(&mut self, record: &Record) -> io::Result<()>;

    /// Write the footer, flush and release the open shard.
    fn close_shard(&mut self) -> io::Result<()>;

    /// Run-wide step after the last partition.
    fn finalize(&mut self, _ctx: &FinalizeContext<'_>) -> io::Result<FinalizeOutcome> {
        Ok(FinalizeOutcome::NotApplicable)
    }
}

/// Borrow the open shard or panic with a lifecycle message.
pub(crate) fn open_shard_mut<'a, W>(out: &'a mut Option<W>, sink: &str) -> &'a mut W {
    match out.as_mut() {
        Some(w) => w,
        None => panic!("{sink}: record routed with no open shard"),
    }
}

/// `{path}.tmp`, next to the final path
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Write `contents` to `{path}.tmp` and rename onto `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = tmp_path_for(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    out.write_all(contents)?;
    out.flush()?;
    drop(out);
    fs::rename(&tmp, path)
}

/// Remove stale .tmp files left by an interrupted run
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == TMP_SUFFIX) {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
