//! Search collaborator: bulk indexing and free-text queries

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::http::post_json;

/// Hits requested per query
pub const DEFAULT_HITS: usize = 10;

/// Full-text index the loader pushes bulk shards into.
pub trait SearchIndex {
    /// Send one bulk-document shard verbatim.
    fn bulk_put(&self, shard: String) -> Result<()>;

    /// Identifiers of the best hits for `query`, best first.
    fn search(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search_request: SearchBody<'a>,
}

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: QueryText<'a>,
    size: usize,
    from: usize,
    fields: [&'static str; 1],
    sort: [&'static str; 1],
    facets: serde_json::Map<String, serde_json::Value>,
    highlight: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct QueryText<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search_result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: String,
}

/// JSON body of a search call.
pub fn search_request_body(query: &str) -> Result<String> {
    let request = SearchRequest {
        search_request: SearchBody {
            query: QueryText { query },
            size: DEFAULT_HITS,
            from: 0,
            fields: ["*"],
            sort: ["-_score"],
            facets: serde_json::Map::new(),
            highlight: serde_json::Map::new(),
        },
    };
    serde_json::to_string(&request).context("Failed to encode search request")
}

/// Hit identifiers from a search response, in response order.
pub fn parse_hits(json: &str) -> Result<Vec<String>> {
    let response: SearchResponse =
        serde_json::from_str(json).context("Failed to parse search response")?;
    Ok(response
        .search_result
        .hits
        .into_iter()
        .map(|hit| hit.id)
        .collect())
}

/// HTTP client for the search service at `base_url` (e.g. `http://localhost:10002`)
#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: String,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn bulk_url(&self) -> String {
        format!("{}/rest/_bulk", self.base_url)
    }

    pub fn search_url(&self) -> String {
        format!("{}/rest/_search", self.base_url)
    }
}

impl SearchIndex for SearchClient {
    fn bulk_put(&self, shard: String) -> Result<()> {
        let url = self.bulk_url();
        post_json(&url, shard).with_context(|| format!("Bulk upload to {url} failed"))?;
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<String>> {
        let url = self.search_url();
        let text = post_json(&url, search_request_body(query)?)
            .with_context(|| format!("Search at {url} failed"))?;
        parse_hits(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body: serde_json::Value =
            serde_json::from_str(&search_request_body("quantum graviti").unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "search_request": {
                    "query": {"query": "quantum graviti"},
                    "size": 10,
                    "from": 0,
                    "fields": ["*"],
                    "sort": ["-_score"],
                    "facets": {},
                    "highlight": {}
                }
            })
        );
    }

    #[test]
    fn query_text_is_escaped() {
        let body = search_request_body("say \"hi\"").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["search_request"]["query"]["query"], "say \"hi\"");
    }

    #[test]
    fn parse_hits_in_order() {
        let json = r#"{
            "search_result": {
                "status": {"total": 1, "successful": 1},
                "hits": [
                    {"id": "a2", "score": 1.5, "fields": {"year": "2020"}},
                    {"id": "a1", "score": 0.7}
                ],
                "total_hits": 2
            }
        }"#;
        assert_eq!(parse_hits(json).unwrap(), vec!["a2", "a1"]);
    }

    #[test]
    fn parse_hits_missing_list() {
        let json = r#"{"search_result": {"total_hits": 0}}"#;
        assert!(parse_hits(json).unwrap().is_empty());
    }

    #[test]
    fn parse_hits_rejects_garbage() {
        assert!(parse_hits("<html>").is_err());
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let client = SearchClient::new("http://blast:10002/");
        assert_eq!(client.bulk_url(), "http://blast:10002/rest/_bulk");
        assert_eq!(client.search_url(), "http://blast:10002/rest/_search");
    }

    #[test]
    #[ignore]
    fn search_live_service() {
        let client = SearchClient::new(crate::config::DEFAULT_SEARCH_URL);
        let hits = client.search("quantum").unwrap();
        assert!(hits.len() <= DEFAULT_HITS);
    }
}
