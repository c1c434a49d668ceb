//! Change analyzer trait.
//!
//! A [`ChangeAnalyzer`] compares a before and an after photograph of the
//! pantry and returns a validated [`Judgment`]. It performs no registry or
//! record I/O; reconciling the judgment is a separate step.
//!
//! Concrete vision providers (Gemini, Ollama) live in the `pantry-tracker`
//! app crate.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::judgment::Judgment;

/// Instruction given to every vision provider. `{date}` is replaced with
/// the current date in `YYYY-MM-DD` form.
pub const DIRECTIVE: &str = "You are a pantry inventory specialist. Analyze the two images provided. \
Image 1 is the 'Before' state, and Image 2 is the 'After' state. \
Identify changes in food and grocery items only. Be as specific as possible with item names \
(e.g. \"Heinz Tomato Ketchup\" not \"ketchup\", \"Olive Oil\" not \"oil\"). \
Do not identify non-food items. If you cannot confidently identify an item, leave it out. \
Do not express uncertainty. \
The current date is {date}. Use it to estimate a reasonable expiry date (YYYY-MM-DD) for each item, or null if none applies.\n\
Reply with JSON containing:\n\
1. `items_added`: every food/grocery item present in the 'After' image but not the 'Before' image, with name and expiry_date.\n\
2. `items_removed`: names of food/grocery items present in the 'Before' image but missing from the 'After' image.\n\
3. `current_full_inventory`: every food/grocery item visible in the 'After' image, with name and expiry_date.";

/// Render [`DIRECTIVE`] for a given date string.
pub fn directive_for(date: &str) -> String {
    DIRECTIVE.replace("{date}", date)
}

/// Two image buffers submitted for one analysis. Never persisted.
#[derive(Debug, Clone)]
pub struct CapturePair {
    pub before: Arc<[u8]>,
    pub after: Arc<[u8]>,
}

/// A vision-capable backend that turns an image pair into a [`Judgment`].
///
/// One call is one blocking external request with no retry. Transport and
/// service failures surface as [`PantryError::Analyzer`](crate::PantryError::Analyzer);
/// unusable replies as [`PantryError::MalformedJudgment`](crate::PantryError::MalformedJudgment).
#[async_trait]
pub trait ChangeAnalyzer: Send + Sync {
    /// Short provider label for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    async fn analyze(&self, before: &[u8], after: &[u8]) -> Result<Judgment>;
}
