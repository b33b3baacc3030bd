//! Convert a small input tree, load it into DuckDB and read it back

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use anyhow::Result;
use citeline_convert::Config;
use citeline_core::ProgressContext;
use citeline_load::{
    Catalog, DuckStore, KeyValueStore, RelationalStore, SearchIndex, load_key_value,
    load_relational, load_search,
};
use tempfile::TempDir;

const PARTITION_2020: &str = "\
# id;categories;version;flags;refs;authors;title
a1;cs.AI;1;0;a2,a3;Doe, J.;A Study Of Things
a4;cs.LG;1;0;a2;Roe, K.,Poe, E.;Learning; Revisited
";

const PARTITION_2019: &str = "\
a2;cs.AI;1;0;;Moe, L.;Foundations
a3;cs.AI;1;0;a2;Doe, J.;Earlier Work
";

/// Search index that remembers bulk bodies and answers with fixed ids
struct StubIndex {
    bodies: RefCell<Vec<String>>,
    hits: Vec<String>,
}

impl SearchIndex for StubIndex {
    fn bulk_put(&self, shard: String) -> Result<()> {
        self.bodies.borrow_mut().push(shard);
        Ok(())
    }

    fn search(&self, _query: &str) -> Result<Vec<String>> {
        Ok(self.hits.clone())
    }
}

fn convert(root: &Path) -> std::path::PathBuf {
    let input = root.join("input");
    let output = root.join("output");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("pscp-2020.csv"), PARTITION_2020).unwrap();
    fs::write(input.join("pscp-2019.csv"), PARTITION_2019).unwrap();

    let config = Config {
        input_dir: input,
        output_dir: output.clone(),
        ..Config::default()
    };
    let summary = citeline_convert::run(&config, &ProgressContext::hidden()).unwrap();
    assert_eq!(summary.total_records, 4);
    output
}

#[test]
fn converted_output_loads_and_answers_queries() {
    let dir = TempDir::new().unwrap();
    let output = convert(dir.path());
    let store = DuckStore::in_memory().unwrap();

    let relational = load_relational(&store, &output.join("graph")).unwrap();
    assert_eq!(relational.shards, 2);
    assert_eq!(relational.records, 4);
    assert_eq!(store.count_rows("papers").unwrap(), 4);
    assert_eq!(store.count_rows("refs").unwrap(), 4);

    let key_value = load_key_value(&store, &output.join("flat")).unwrap();
    assert_eq!(key_value.records, 4);

    let a4 = store.get_record("a4").unwrap().unwrap();
    assert_eq!(a4.year, "2020");
    assert_eq!(a4.authors, "Roe,  K., Poe,  E.");
    assert_eq!(a4.title, "Learning; Revisited");

    let index = StubIndex {
        bodies: RefCell::new(Vec::new()),
        hits: vec!["a3".into(), "nowhere".into(), "a2".into()],
    };
    let search = load_search(&index, &output.join("bulk")).unwrap();
    assert_eq!(search.shards, 2);
    assert_eq!(search.records, 4);

    let catalog = Catalog::new(&index, &store, &store);

    let a2 = catalog.paper("a2").unwrap().unwrap();
    assert_eq!(a2.referenced_by, 3);
    assert_eq!(a2.record.title, "Foundations");

    let hits: Vec<String> = catalog
        .search("doe")
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(hits, vec!["a3", "a2"]);

    let citing: Vec<String> = catalog
        .referenced_by("a2")
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(citing, vec!["a1", "a3", "a4"]);
}

#[test]
fn relational_load_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let output = convert(dir.path());
    let store = DuckStore::in_memory().unwrap();

    load_relational(&store, &output.join("graph")).unwrap();
    load_relational(&store, &output.join("graph")).unwrap();
    assert_eq!(store.count_rows("refs").unwrap(), 4);
    assert_eq!(store.referencers_of("a3").unwrap(), vec!["a1"]);
}
