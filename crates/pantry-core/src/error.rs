//! Domain error taxonomy.
//!
//! Fallible operations across the workspace return `anyhow::Result`; a
//! [`PantryError`] inside the chain carries the category so that callers
//! (the HTTP adapter in particular) can recover it with
//! [`anyhow::Error::downcast_ref`].

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PantryError {
    /// The vision model replied with something that does not fit the
    /// judgment schema. Nothing is persisted.
    #[error("malformed judgment: {0}")]
    MalformedJudgment(String),

    /// The external inference call failed (transport or non-2xx status).
    #[error("analyzer error: {0}")]
    Analyzer(String),

    /// No inventory entry carries this id.
    #[error("item not found: {0}")]
    NotFound(Uuid),

    /// The name is blank after normalization and cannot own an identity.
    #[error("item name must not be empty")]
    EmptyName,

    /// The ingestion queue is at capacity; the capture pair was dropped.
    #[error("ingestion queue is full")]
    QueueFull,

    /// The analyzer provider is disabled in the configuration.
    #[error("analyzer provider is disabled")]
    Disabled,
}
