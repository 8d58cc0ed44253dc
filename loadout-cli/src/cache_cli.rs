//! Cache maintenance commands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use loadout_core::cache::{self, CacheStore, CacheValidation, FileCacheStore};

/// Inspect and maintain the content cache
#[derive(Parser, Debug)]
pub struct CacheCommand {
    #[clap(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Show the cached version and entries
    Show {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Validate the cache against a build version, clearing it if outdated
    Validate {
        /// Current build version
        #[clap(long = "build-version")]
        build_version: String,
    },

    /// Delete the cache file
    Clear,
}

impl CacheCommand {
    pub async fn execute(self, cache_file: Option<PathBuf>) -> Result<()> {
        let store = cache_store(cache_file)?;
        match self.command {
            CacheSubcommand::Show { json } => execute_show(&store, json),
            CacheSubcommand::Validate { build_version } => {
                execute_validate(&store, &build_version)
            }
            CacheSubcommand::Clear => execute_clear(&store),
        }
    }
}

/// The cache file to operate on: explicit path or the platform default
pub fn cache_store(cache_file: Option<PathBuf>) -> Result<FileCacheStore> {
    match cache_file {
        Some(path) => Ok(FileCacheStore::new(path)),
        None => FileCacheStore::in_default_location(),
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Bytes")]
    bytes: usize,
}

fn execute_show(store: &FileCacheStore, json_output: bool) -> Result<()> {
    let record = store.load()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Cache: {}", store.path().display());
    println!(
        "Version: {}",
        record.version.as_deref().unwrap_or("(untagged)")
    );

    if record.entries.is_empty() {
        println!("No cached entries.");
        return Ok(());
    }

    let rows: Vec<EntryRow> = record
        .entries
        .iter()
        .map(|(key, blob)| EntryRow {
            key: key.clone(),
            bytes: blob.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn execute_validate(store: &FileCacheStore, version: &str) -> Result<()> {
    let mut record = store.load()?;
    let validation = cache::validate(&mut record, version, false);

    if validation.needs_persist() {
        store
            .save(&record)
            .context("Failed to save validated cache")?;
    }

    match validation {
        CacheValidation::OfflineBundle => println!("Offline bundle, cache not used"),
        CacheValidation::Empty => println!("✗ Cache is empty"),
        CacheValidation::Adopted => println!("✓ Untagged cache adopted for version {version}"),
        CacheValidation::Outdated { previous } => {
            println!("✗ Cache was for version {previous}, cleared")
        }
        CacheValidation::Current => println!("✓ Cache is current for version {version}"),
    }
    Ok(())
}

fn execute_clear(store: &FileCacheStore) -> Result<()> {
    store.remove()?;
    println!("✓ Removed {}", store.path().display());
    Ok(())
}
