//! # Pantry Tracker
//!
//! Keeps a household pantry inventory up to date from before/after
//! photographs. A vision model judges what was added and removed between
//! two captures; the judgment is reconciled into a durable record whose
//! item identities stay stable across every analysis.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐   ┌────────────┐
//! │ Captures │──▶│ Coordinator │──▶│ Analyzer │──▶│   Ledger   │
//! │ (bytes)  │   │ pairs+queue │   │ (vision) │   │ reconcile  │
//! └──────────┘   └─────────────┘   └──────────┘   └─────┬──────┘
//!                                                       ▼
//!                 ┌──────────┐                   ┌────────────┐
//!                 │ HTTP/CLI │◀─────── reads ────│ FileStore  │
//!                 └──────────┘                   │ (JSON)     │
//!                                                └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pantry inventory add "Basmati Rice" --expiry 2026-01-01
//! pantry inventory list
//! pantry analyze before.jpg after.jpg
//! pantry serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`file_store`] | JSON-file record store with rename-on-write |
//! | [`analyzer`] | Gemini / Ollama vision providers |
//! | [`ledger`] | Serialized read-modify-write over the record |
//! | [`ingest`] | Sliding-pair capture dispatch and worker pool |
//! | [`inventory`] | CLI commands |
//! | [`server`] | HTTP adapter |

pub mod analyzer;
pub mod config;
pub mod file_store;
pub mod ingest;
pub mod inventory;
pub mod ledger;
pub mod server;
