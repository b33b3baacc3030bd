//! Paper, search and references subcommands - JSON on stdout

use std::path::PathBuf;

use anyhow::Result;
use citeline_load::{Catalog, DuckStore, SearchClient};
use clap::Args;
use serde::Serialize;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// DuckDB file (overrides [store] path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Search service base URL (overrides [search] url)
    #[arg(long)]
    pub search_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PaperArgs {
    /// Paper identifier
    pub id: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

struct Backends {
    search: SearchClient,
    store: DuckStore,
}

impl Backends {
    fn open(args: &StoreArgs, config: &Config) -> Result<Self> {
        let path = args.store.clone().or_else(|| config.store_path());
        let url = args.search_url.as_deref().unwrap_or(&config.search.url);
        Ok(Self {
            search: SearchClient::new(url),
            store: DuckStore::open_or_memory(path.as_deref())?,
        })
    }

    fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&self.search, &self.store, &self.store)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn paper(args: PaperArgs, config: &Config) -> Result<()> {
    let backends = Backends::open(&args.store, config)?;
    match backends.catalog().paper(&args.id)? {
        Some(view) => print_json(&view),
        None => anyhow::bail!("paper {} not found", args.id),
    }
}

pub fn search(args: SearchArgs, config: &Config) -> Result<()> {
    let backends = Backends::open(&args.store, config)?;
    let hits = backends.catalog().search(&args.query)?;
    log::info!("{} hit(s) for {:?}", hits.len(), args.query);
    print_json(&hits)
}

pub fn references(args: PaperArgs, config: &Config) -> Result<()> {
    let backends = Backends::open(&args.store, config)?;
    print_json(&backends.catalog().referenced_by(&args.id)?)
}
