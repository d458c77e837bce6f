//! Candidate scoring for the record matcher.
//!
//! This module contains:
//! - Closest-filesize candidate selection
//! - Near-miss key suggestions for files with no key match

use crate::models::CatalogRecord;

// ============================================================================
// Thresholds
// ============================================================================

/// Minimum Jaro-Winkler similarity for a near-miss key to be reported.
pub const SUGGESTION_THRESHOLD: f64 = 0.85;

// ============================================================================
// Filesize Selection
// ============================================================================

/// Byte distance between a catalog filesize and the file on disk.
/// `None` when the catalog has no usable size.
pub fn size_diff(catalog_size: Option<u64>, on_disk: u64) -> Option<u64> {
    catalog_size.map(|size| size.abs_diff(on_disk))
}

/// Pick the candidate whose filesize is closest to `on_disk`.
///
/// Candidates without a filesize are skipped. On equal distance the first
/// candidate wins, so callers must pass candidates in a stable order.
pub fn select_closest<'a, I>(candidates: I, on_disk: u64) -> Option<(&'a CatalogRecord, u64)>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let mut best: Option<(&'a CatalogRecord, u64)> = None;
    for candidate in candidates {
        let Some(diff) = size_diff(candidate.filesize, on_disk) else {
            continue;
        };
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((candidate, diff)),
        }
    }
    best
}

// ============================================================================
// Near-miss Suggestions
// ============================================================================

/// Similarity between two join keys (0.0 to 1.0).
pub fn key_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase())
}

/// Most similar key at or above [`SUGGESTION_THRESHOLD`]; the first of equals wins.
pub fn closest_key<'a, I>(key: &str, keys: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in keys {
        let similarity = key_similarity(key, candidate);
        if similarity < SUGGESTION_THRESHOLD {
            continue;
        }
        match best {
            Some((_, best_similarity)) if similarity <= best_similarity => {}
            _ => best = Some((candidate, similarity)),
        }
    }
    best
}
