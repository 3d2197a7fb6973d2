//! Edit-distance ranking of candidate parts

use crate::storage::PartRecord;

/// The winning candidate for a query and its edit distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub part: &'a PartRecord,
    pub distance: usize,
}

/// Picks the candidate whose MPN is closest to `query`
///
/// Distance is the Levenshtein distance between `query` and the MPN. Only a
/// strictly smaller distance replaces the current best, so ties go to the
/// candidate that comes first. Returns `None` for an empty slice: an item
/// without candidates has no verdict.
pub fn best_match<'a>(query: &str, candidates: &'a [PartRecord]) -> Option<MatchResult<'a>> {
    let mut best: Option<MatchResult<'a>> = None;

    for part in candidates {
        let distance = strsim::levenshtein(query, &part.mpn);
        tracing::trace!("{} vs {}: distance {}", query, part.mpn, distance);

        if best.map_or(true, |current| distance < current.distance) {
            best = Some(MatchResult { part, distance });
        }
    }

    best
}
