//! Read API over the loaded collaborators

use anyhow::Result;
use serde::Serialize;

use crate::search::SearchIndex;
use crate::store::{KeyValueStore, RelationalStore, StoredRecord};

/// One paper as returned by [`Catalog::paper`] and [`Catalog::search`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperView {
    pub id: String,
    pub record: StoredRecord,
    /// Number of loaded records citing this one
    pub referenced_by: usize,
}

/// Lookups combining search hits, stored records and the citation graph
pub struct Catalog<'a> {
    search: &'a dyn SearchIndex,
    relational: &'a dyn RelationalStore,
    records: &'a dyn KeyValueStore,
}

impl<'a> Catalog<'a> {
    pub fn new(
        search: &'a dyn SearchIndex,
        relational: &'a dyn RelationalStore,
        records: &'a dyn KeyValueStore,
    ) -> Self {
        Self {
            search,
            relational,
            records,
        }
    }

    /// Stored record plus inbound reference count; `None` if never stored.
    pub fn paper(&self, id: &str) -> Result<Option<PaperView>> {
        let Some(record) = self.records.get_record(id)? else {
            return Ok(None);
        };
        let referenced_by = self.relational.referencers_of(id)?.len();
        Ok(Some(PaperView {
            id: id.to_string(),
            record,
            referenced_by,
        }))
    }

    /// Search hits mapped through [`paper`](Self::paper), best first. Hits
    /// without a stored record are dropped.
    pub fn search(&self, query: &str) -> Result<Vec<PaperView>> {
        let mut papers = Vec::new();
        for id in self.search.search(query)? {
            match self.paper(&id)? {
                Some(view) => papers.push(view),
                None => log::debug!("search hit {id} has no stored record"),
            }
        }
        Ok(papers)
    }

    /// Stored records of the papers citing `id`.
    pub fn referenced_by(&self, id: &str) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for referencer in self.relational.referencers_of(id)? {
            if let Some(record) = self.records.get_record(&referencer)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
