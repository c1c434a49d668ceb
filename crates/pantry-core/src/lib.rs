//! # Pantry Core
//!
//! Shared, I/O-free logic for Pantry Tracker: the inventory data model,
//! the item identity registry, the judgment schema produced by a vision
//! model, the reconciliation algorithm, and the store and analyzer traits.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Concrete stores and vision providers live in
//! the `pantry-tracker` app crate.

pub mod analyzer;
pub mod error;
pub mod judgment;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod store;

pub use error::PantryError;
