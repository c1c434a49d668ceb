//! # Pantry Tracker CLI (`pantry`)
//!
//! ## Usage
//!
//! ```bash
//! pantry --config ./config/pantry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pantry serve` | Start the ingestion workers and the HTTP server; Ctrl-C drains queued pairs before exit |
//! | `pantry analyze <before> <after>` | Analyze one image pair and reconcile it |
//! | `pantry inventory list` | Print the current inventory |
//! | `pantry inventory add <name> [--expiry YYYY-MM-DD]` | Add an item by hand |
//! | `pantry inventory delete <id>` | Remove an item |
//! | `pantry inventory names` | Print item names (recipe feature input) |
//! | `pantry resolve <name>` | Print the stable id for a name |
//! | `pantry snapshot` | Print the whole record as JSON |
//!
//! Logging goes to stderr; set `RUST_LOG` (e.g. `RUST_LOG=pantry_tracker=debug`)
//! to change the level.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pantry_tracker::analyzer::create_analyzer;
use pantry_tracker::server::{run_server, shutdown_signal, AppState};
use pantry_tracker::{config, ingest, inventory};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pantry Tracker: photo-driven pantry inventory.
#[derive(Parser)]
#[command(
    name = "pantry",
    about = "Pantry Tracker: keep a pantry inventory current from before/after photos",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pantry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ingestion workers and the HTTP server.
    Serve,

    /// Analyze a before/after image pair and reconcile the result.
    Analyze {
        /// Image of the pantry before the change.
        before: PathBuf,
        /// Image of the pantry after the change.
        after: PathBuf,
    },

    /// Inspect or edit the inventory by hand.
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },

    /// Print the stable id for an item name, creating it if new.
    Resolve {
        name: String,
    },

    /// Print the whole pantry record as JSON.
    Snapshot,
}

#[derive(Subcommand)]
enum InventoryAction {
    /// List the current inventory.
    List,

    /// Add one item.
    Add {
        name: String,

        /// Expiry date (YYYY-MM-DD).
        #[arg(long)]
        expiry: Option<String>,
    },

    /// Delete one item by id.
    Delete {
        id: String,
    },

    /// Print the names of all items, one per line.
    Names,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let ledger = Arc::new(inventory::open_ledger(&cfg));
            let analyzer = create_analyzer(&cfg.analyzer)?;
            info!(provider = analyzer.name(), "analyzer ready");

            let ingestion = ingest::start(&cfg.ingest, analyzer, ledger.clone());
            let state = AppState {
                ledger,
                capture: ingestion.coordinator.clone(),
            };
            let served = run_server(&cfg, state, shutdown_signal()).await;
            ingestion.shutdown().await;
            served?;
        }
        Commands::Analyze { before, after } => {
            inventory::run_analyze(&cfg, &before, &after).await?;
        }
        Commands::Inventory { action } => match action {
            InventoryAction::List => inventory::run_list(&cfg).await?,
            InventoryAction::Add { name, expiry } => {
                inventory::run_add(&cfg, &name, expiry.as_deref()).await?
            }
            InventoryAction::Delete { id } => inventory::run_delete(&cfg, &id).await?,
            InventoryAction::Names => inventory::run_names(&cfg).await?,
        },
        Commands::Resolve { name } => {
            inventory::run_resolve(&cfg, &name).await?;
        }
        Commands::Snapshot => {
            inventory::run_snapshot(&cfg).await?;
        }
    }

    Ok(())
}
