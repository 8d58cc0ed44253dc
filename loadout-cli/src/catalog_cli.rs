//! Catalog inspection commands

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use loadout_core::catalog::CatalogManifest;

/// Inspect resource catalogs
#[derive(Parser, Debug)]
pub struct CatalogCommand {
    #[clap(subcommand)]
    pub command: CatalogSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogSubcommand {
    /// List the resources in a catalog
    List {
        /// Catalog file (YAML or JSON)
        catalog: PathBuf,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Report missing dependencies and dependency cycles
    Check {
        /// Catalog file (YAML or JSON)
        catalog: PathBuf,
    },
}

impl CatalogCommand {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            CatalogSubcommand::List { catalog, json } => execute_list(catalog, json),
            CatalogSubcommand::Check { catalog } => execute_check(catalog),
        }
    }
}

/// Table row for catalog listings
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Dependencies")]
    dependencies: String,
    #[tabled(rename = "URL")]
    url: String,
}

fn execute_list(path: PathBuf, json_output: bool) -> Result<()> {
    let manifest = CatalogManifest::from_file(&path)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    if manifest.is_empty() {
        println!("Catalog has no resources.");
        return Ok(());
    }

    let rows: Vec<ResourceRow> = manifest
        .resources
        .iter()
        .map(|(key, entry)| ResourceRow {
            key: key.clone(),
            kind: entry.kind.to_string(),
            name: entry.display_name.clone(),
            dependencies: if entry.dependencies.is_empty() {
                "-".to_string()
            } else {
                entry.dependencies.join(", ")
            },
            url: entry.url.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{} resource(s):\n", manifest.len());
    println!("{table}");
    Ok(())
}

fn execute_check(path: PathBuf) -> Result<()> {
    let manifest = CatalogManifest::from_file(&path)?;
    let check = manifest.check();

    for (key, dependency) in &check.missing_dependencies {
        println!("✗ {key} depends on unknown resource '{dependency}'");
    }
    for cycle in &check.cycles {
        println!("✗ dependency cycle: {}", cycle.join(" -> "));
    }

    if !check.is_clean() {
        bail!(
            "Catalog {} has {} problem(s)",
            path.display(),
            check.missing_dependencies.len() + check.cycles.len()
        );
    }

    println!("✓ {} resource(s), no problems found", manifest.len());
    Ok(())
}
