//! Normalized record routed to every sink

use crate::normalize;
use crate::reader::{FieldLayout, RawRecord};

/// One accepted input record with every sink-specific normalization applied.
///
/// Built once per line; sinks pick the forms they serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier-safe record id
    pub id: String,
    /// Stemmed surnames, space-separated
    pub authors: String,
    /// Stemmed, stop-word-filtered title tokens, space-separated
    pub title: String,
    /// Display-safe author list with `", "` separators
    pub display_authors: String,
    /// Display-safe title
    pub display_title: String,
    /// Identifier-safe referenced ids, empty when the record cites nothing
    pub references: Vec<String>,
}

impl Record {
    pub fn from_raw(raw: &RawRecord, layout: &FieldLayout) -> Self {
        let authors = raw.field(layout.authors);
        let title = raw.field(layout.title);
        Self {
            id: normalize::identifier_safe(raw.field(layout.id)),
            authors: normalize::normalize_authors(authors),
            title: normalize::normalize_title(title),
            display_authors: normalize::display_authors(authors),
            display_title: normalize::clean_field(title),
            references: normalize::references(raw.field(layout.references)),
        }
    }

    /// Keyword tokens of authors and title, for vocabulary accounting.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.authors
            .split_whitespace()
            .chain(self.title.split_whitespace())
    }
}
