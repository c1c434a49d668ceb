//! CLI commands over the pantry record.
//!
//! Each `run_*` function opens the configured [`FileStore`], performs one
//! [`Ledger`] operation, and prints the result to stdout. The same ledger
//! operations back the HTTP endpoints in [`server`](crate::server).

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pantry_core::models::PantryItem;
use uuid::Uuid;

use crate::analyzer::create_analyzer;
use crate::config::Config;
use crate::file_store::FileStore;
use crate::ledger::Ledger;

/// Open the ledger over the configured file store.
pub fn open_ledger(config: &Config) -> Ledger {
    Ledger::new(Arc::new(FileStore::from_config(config)))
}

fn print_items(items: &[PantryItem]) {
    if items.is_empty() {
        println!("(pantry is empty)");
        return;
    }
    for item in items {
        println!(
            "{}  {:<32} expires: {:<10}  added: {}",
            item.id,
            item.name,
            item.expiry_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            item.date_added
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

pub async fn run_list(config: &Config) -> Result<()> {
    let items = open_ledger(config).inventory().await?;
    print_items(&items);
    Ok(())
}

pub async fn run_add(config: &Config, name: &str, expiry: Option<&str>) -> Result<()> {
    let expiry_date = expiry
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("expiry must be YYYY-MM-DD")?;

    let item = open_ledger(config).add_item(name, expiry_date).await?;
    println!("added {} ({})", item.name, item.id);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let id = Uuid::parse_str(id).with_context(|| format!("invalid item id: {}", id))?;
    let item = open_ledger(config).delete_item(id).await?;
    println!("deleted {} ({})", item.name, item.id);
    Ok(())
}

pub async fn run_names(config: &Config) -> Result<()> {
    for name in open_ledger(config).ingredient_names().await? {
        println!("{}", name);
    }
    Ok(())
}

pub async fn run_resolve(config: &Config, name: &str) -> Result<()> {
    let id = open_ledger(config).resolve(name).await?;
    println!("{}", id);
    Ok(())
}

pub async fn run_snapshot(config: &Config) -> Result<()> {
    let record = open_ledger(config).snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Analyze one before/after image pair and reconcile the result.
pub async fn run_analyze(config: &Config, before: &Path, after: &Path) -> Result<()> {
    let before_bytes = tokio::fs::read(before)
        .await
        .with_context(|| format!("Failed to read image: {}", before.display()))?;
    let after_bytes = tokio::fs::read(after)
        .await
        .with_context(|| format!("Failed to read image: {}", after.display()))?;

    let analyzer = create_analyzer(&config.analyzer)?;
    let judgment = analyzer.analyze(&before_bytes, &after_bytes).await?;
    let record = open_ledger(config).reconcile(&judgment).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
