//! Streaming record reader over semicolon-delimited partition files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::ConvertError;

/// Buffer size for partition readers (256KB)
const READ_BUF_SIZE: usize = 256 * 1024;

/// Initial capacity for the per-line read buffer
const LINE_BUF_CAPACITY: usize = 4096;

/// Field separator within a record line
pub const DELIMITER: char = ';';

/// Positions of the semantic fields within a record line.
///
/// `max_splits` bounds the split so the last field keeps any embedded
/// delimiters verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub id: usize,
    pub categories: usize,
    pub references: usize,
    pub authors: usize,
    pub title: usize,
    pub max_splits: usize,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            id: 0,
            categories: 1,
            references: 4,
            authors: 5,
            title: 6,
            max_splits: 6,
        }
    }
}

impl FieldLayout {
    /// Minimum number of fields a line must split into.
    pub fn required_fields(&self) -> usize {
        [
            self.id,
            self.categories,
            self.references,
            self.authors,
            self.title,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

/// Accept records whose comma-separated category list has an entry starting
/// with `prefix` (e.g. `cs.` or `hep-th`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    prefix: String,
}

impl CategoryFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, categories: &str) -> bool {
        categories
            .split(',')
            .any(|c| c.trim().starts_with(self.prefix.as_str()))
    }
}

/// One non-comment input line split into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number within the partition
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRecord {
    /// Field at `idx`, or `""` when the line is shorter.
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map_or("", String::as_str)
    }
}

/// Lazy iterator of [`RawRecord`]s over one partition.
///
/// Comment lines (first non-whitespace char `#`) and blank lines are skipped.
/// Lines with fewer fields than the layout requires yield
/// [`ConvertError::Malformed`].
pub struct RecordReader<R> {
    reader: R,
    partition: String,
    origin: PathBuf,
    layout: FieldLayout,
    filter: Option<CategoryFilter>,
    buf: String,
    line_no: usize,
    rejected: usize,
}

impl<R> std::fmt::Debug for RecordReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("partition", &self.partition)
            .field("line_no", &self.line_no)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, partition: &str) -> Self {
        Self {
            reader,
            partition: partition.to_string(),
            origin: PathBuf::from(partition),
            layout: FieldLayout::default(),
            filter: None,
            buf: String::with_capacity(LINE_BUF_CAPACITY),
            line_no: 0,
            rejected: 0,
        }
    }

    pub fn with_layout(mut self, layout: FieldLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_filter(mut self, filter: Option<CategoryFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Path reported in I/O errors.
    pub fn with_origin(mut self, origin: &Path) -> Self {
        self.origin = origin.to_path_buf();
        self
    }

    /// Lines read so far, comments included.
    pub fn lines_scanned(&self) -> usize {
        self.line_no
    }

    /// Records dropped by the category filter.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    fn split(&self) -> Result<Vec<String>, ConvertError> {
        let line = self.buf.trim_end_matches(['\n', '\r']);
        let fields: Vec<String> = line
            .splitn(self.layout.max_splits + 1, DELIMITER)
            .map(str::to_string)
            .collect();
        let expected = self.layout.required_fields();
        if fields.len() < expected {
            return Err(ConvertError::Malformed {
                partition: self.partition.clone(),
                line: self.line_no,
                found: fields.len(),
                expected,
            });
        }
        Ok(fields)
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<RawRecord, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(ConvertError::io(&self.origin, e))),
            }
            self.line_no += 1;

            let trimmed = self.buf.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields = match self.split() {
                Ok(fields) => fields,
                Err(e) => return Some(Err(e)),
            };

            if let Some(filter) = &self.filter {
                if !filter.matches(&fields[self.layout.categories]) {
                    self.rejected += 1;
                    continue;
                }
            }

            return Some(Ok(RawRecord {
                line: self.line_no,
                fields,
            }));
        }
    }
}

/// Open a partition file for buffered reading, gunzipping `*.gz` files.
pub fn open_partition(path: &Path) -> Result<Box<dyn BufRead>, ConvertError> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUF_SIZE,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUF_SIZE, file)))
    }
}
