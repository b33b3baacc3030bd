//! Flat-row sink: delimited `id,year,authors,title` rows for key-value loading

use std::io;

use citeline_core::Record;

use crate::sink::{ShardFile, Sink, open_shard_mut};

const NAME: &str = "flat";

/// Column order of a flat row
pub const COLUMNS: [&str; 4] = ["id", "year", "authors", "title"];

/// One CSV row per record, display forms of authors and title.
#[derive(Debug, Default)]
pub struct FlatRowSink {
    out: Option<csv::Writer<ShardFile>>,
    year: String,
}

impl FlatRowSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for FlatRowSink {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn open_shard(&mut self, out: ShardFile, partition: &str) -> io::Result<()> {
        self.out = Some(
            csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(out),
        );
        self.year = partition.to_string();
        Ok(())
    }

    fn accept_record(&mut self, record: &Record) -> io::Result<()> {
        let out = open_shard_mut(&mut self.out, NAME);
        out.write_record([
            record.id.as_str(),
            self.year.as_str(),
            record.display_authors.as_str(),
            record.display_title.as_str(),
        ])?;
        Ok(())
    }

    fn close_shard(&mut self) -> io::Result<()> {
        let mut out = self
            .out
            .take()
            .unwrap_or_else(|| panic!("{NAME}: close_shard with no open shard"));
        out.flush()
    }
}
