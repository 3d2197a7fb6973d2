//! Validation of extracted component values against the local mirror
//!
//! Each stored item is looked up by substring against the mirrored MPNs.
//! Items with candidates are linked to the candidate with the smallest edit
//! distance; items without candidates have no verdict and stay unlinked.

mod matcher;

pub use matcher::{best_match, MatchResult};

use crate::output::progress::create_progress_bar;
use crate::storage::{ItemRecord, Storage};
use crate::ValidatorError;

/// Outcome counts of a validation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Items examined
    pub items: usize,

    /// Items linked to a part
    pub matched: usize,

    /// Items whose value matched no stored MPN
    pub without_candidates: usize,

    /// Items with a blank value
    pub blank: usize,
}

/// Matches every stored item against the parts mirror and persists the links
///
/// Previously linked items are re-evaluated, so a refreshed mirror can move
/// an item to a closer part.
pub fn validate_items<S>(
    storage: &mut S,
    show_progress: bool,
) -> Result<ValidationSummary, ValidatorError>
where
    S: Storage + ?Sized,
{
    let items = storage.get_items()?;
    tracing::info!("Validating {} items against local parts database", items.len());

    let progress = create_progress_bar(items.len() as u64, "Validating items", show_progress);
    let mut summary = ValidationSummary::default();

    for item in &items {
        summary.items += 1;
        progress.inc(1);

        if item.value.trim().is_empty() {
            summary.blank += 1;
            continue;
        }

        if validate_item(storage, item)? {
            summary.matched += 1;
        } else {
            summary.without_candidates += 1;
        }
    }

    progress.finish_and_clear();

    tracing::info!(
        "Validation finished: {} matched, {} without candidates, {} blank",
        summary.matched,
        summary.without_candidates,
        summary.blank
    );

    Ok(summary)
}

/// Resolves a single item, returning whether it was linked
fn validate_item<S>(storage: &mut S, item: &ItemRecord) -> Result<bool, ValidatorError>
where
    S: Storage + ?Sized,
{
    let candidates = storage.find_candidates(&item.value)?;

    let Some(result) = best_match(&item.value, &candidates) else {
        tracing::debug!("No candidates for item {} ({})", item.id, item.value);
        return Ok(false);
    };

    tracing::debug!(
        "Item {} ({}) matched {} [{}] at distance {} among {} candidates",
        item.id,
        item.value,
        result.part.mpn,
        result.part.external_id,
        result.distance,
        candidates.len()
    );

    let part_id = result.part.id;
    storage.link_item(item.id, part_id)?;
    Ok(true)
}
