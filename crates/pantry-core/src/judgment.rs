//! Judgment schema and boundary validation.
//!
//! A [`Judgment`] is what one vision-model call says about a before/after
//! image pair. The model's reply is untrusted text, so it goes through
//! [`parse_judgment`] which accepts exactly this shape:
//!
//! ```json
//! {
//!   "items_added": [{ "name": "Milk", "expiry_date": "2025-01-01" }],
//!   "items_removed": ["Eggs"],
//!   "current_full_inventory": [{ "name": "Milk", "expiry_date": "2025-01-01" }]
//! }
//! ```
//!
//! All three lists are required, unknown fields are rejected, and
//! `expiry_date` must be `null` (or absent) or a `YYYY-MM-DD` date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PantryError;

/// An item as reported by the model, before identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JudgedItem {
    pub name: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl JudgedItem {
    pub fn new(name: impl Into<String>, expiry_date: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            expiry_date,
        }
    }
}

/// Structured output of one change analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Judgment {
    pub items_added: Vec<JudgedItem>,
    pub items_removed: Vec<String>,
    pub current_full_inventory: Vec<JudgedItem>,
}

/// Parse and validate a model reply into a [`Judgment`].
///
/// Replies wrapped in a Markdown code fence (```` ```json ... ``` ````) are
/// unwrapped first.
pub fn parse_judgment(text: &str) -> Result<Judgment, PantryError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(PantryError::MalformedJudgment("empty reply".to_string()));
    }
    serde_json::from_str(body).map_err(|e| PantryError::MalformedJudgment(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
