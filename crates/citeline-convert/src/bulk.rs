//! Bulk-document sink: JSON arrays of search-engine PUT operations

use std::io::{self, Write};

use citeline_core::Record;
use serde::Serialize;

use crate::sink::{ShardFile, Sink, open_shard_mut};

const NAME: &str = "bulk";

#[derive(Debug, Serialize)]
struct Operation<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    document: Document<'a>,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    id: &'a str,
    fields: Fields<'a>,
}

#[derive(Debug, Serialize)]
struct Fields<'a> {
    year: &'a str,
    authors: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors_display: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_display: Option<&'a str>,
}

/// Writes one JSON array per shard:
///
/// ```text
/// [
/// {"type":"PUT","document":{"id":"a1","fields":{"year":"2020",...}}},
/// {"type":"PUT",...}
/// ]
/// ```
///
/// The comma goes in front of every entry but the first, so shards stay
/// valid JSON for any record count including zero.
#[derive(Debug, Default)]
pub struct BulkDocumentSink {
    out: Option<ShardFile>,
    year: String,
    first: bool,
    audit_fields: bool,
}

impl BulkDocumentSink {
    pub fn new(audit_fields: bool) -> Self {
        Self {
            audit_fields,
            ..Self::default()
        }
    }
}

impl Sink for BulkDocumentSink {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn open_shard(&mut self, mut out: ShardFile, partition: &str) -> io::Result<()> {
        out.write_all(b"[")?;
        self.out = Some(out);
        self.year = partition.to_string();
        self.first = true;
        Ok(())
    }

    fn accept_record(&mut self, record: &Record) -> io::Result<()> {
        let op = Operation {
            kind: "PUT",
            document: Document {
                id: &record.id,
                fields: Fields {
                    year: &self.year,
                    authors: &record.authors,
                    title: &record.title,
                    authors_display: self
                        .audit_fields
                        .then_some(record.display_authors.as_str()),
                    title_display: self.audit_fields.then_some(record.display_title.as_str()),
                },
            },
        };

        let out = open_shard_mut(&mut self.out, NAME);
        if !self.first {
            out.write_all(b",")?;
        }
        out.write_all(b"\n")?;
        serde_json::to_writer(&mut *out, &op)?;
        self.first = false;
        Ok(())
    }

    fn close_shard(&mut self) -> io::Result<()> {
        let mut out = self
            .out
            .take()
            .unwrap_or_else(|| panic!("{NAME}: close_shard with no open shard"));
        out.write_all(b"\n]\n")?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::BufWriter;
    use tempfile::TempDir;

    fn record(id: &str, authors: &str, title: &str) -> Record {
        Record {
            id: id.to_string(),
            authors: authors.to_string(),
            title: title.to_string(),
            display_authors: format!("{authors} (display)"),
            display_title: format!("{title} (display)"),
            references: Vec::new(),
        }
    }

    fn write_shard(sink: &mut BulkDocumentSink, records: &[Record]) -> String {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2020_1.json");
        let out = BufWriter::new(File::create(&path).unwrap());
        sink.open_shard(out, "2020").unwrap();
        for r in records {
            sink.accept_record(r).unwrap();
        }
        sink.close_shard().unwrap();
        fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn commas_between_entries_only() {
        let mut sink = BulkDocumentSink::new(false);
        let text = write_shard(
            &mut sink,
            &[record("a1", "doe", "studi"), record("a2", "roe", "thing")],
        );
        assert_eq!(
            text,
            "[\n\
             {\"type\":\"PUT\",\"document\":{\"id\":\"a1\",\"fields\":{\"year\":\"2020\",\"authors\":\"doe\",\"title\":\"studi\"}}},\n\
             {\"type\":\"PUT\",\"document\":{\"id\":\"a2\",\"fields\":{\"year\":\"2020\",\"authors\":\"roe\",\"title\":\"thing\"}}}\n\
             ]\n"
        );
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_shard_is_valid_json() {
        let mut sink = BulkDocumentSink::new(false);
        let text = write_shard(&mut sink, &[]);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed.as_array().unwrap().is_empty());
    }

    #[test]
    fn first_flag_resets_per_shard() {
        let mut sink = BulkDocumentSink::new(false);
        write_shard(&mut sink, &[record("a1", "doe", "x")]);
        let text = write_shard(&mut sink, &[record("a2", "roe", "y")]);
        assert!(text.starts_with("[\n{"));
    }

    #[test]
    fn audit_fields_added_on_request() {
        let mut sink = BulkDocumentSink::new(true);
        let text = write_shard(&mut sink, &[record("a1", "doe", "studi")]);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let fields = &parsed[0]["document"]["fields"];
        assert_eq!(fields["authors_display"], "doe (display)");
        assert_eq!(fields["title_display"], "studi (display)");
    }

    #[test]
    fn quotes_in_values_stay_valid() {
        let mut sink = BulkDocumentSink::new(false);
        let text = write_shard(&mut sink, &[record("a1", "o\\neil", "x")]);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["document"]["fields"]["authors"], "o\\neil");
    }

    #[test]
    #[should_panic(expected = "no open shard")]
    fn accept_without_open_panics() {
        let mut sink = BulkDocumentSink::new(false);
        let _ = sink.accept_record(&record("a1", "doe", "x"));
    }
}
