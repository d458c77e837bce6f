//! Canonical artist registry.
//!
//! Resolves cleaned artist text to the registry's display name and builds or
//! merges registry files. Comparison keys are lower-cased and
//! diacritic-stripped so "Aníbal Troilo" and "ANIBAL TROILO" are one name.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::ArtistMaster;
use crate::normalize::strip_diacritics;

/// Comparison key for artist names.
pub fn artist_key(name: &str) -> String {
    strip_diacritics(name.trim()).to_lowercase()
}

/// Read-only lookup structure over the curated registry.
#[derive(Debug, Default)]
pub struct ArtistRegistry {
    /// Canonical names with their keys, in registry order.
    entries: Vec<(String, String)>,
    by_name: FxHashMap<String, usize>,
    by_alias: FxHashMap<String, usize>,
}

impl ArtistRegistry {
    /// Build from registry entries. The first entry wins when two names share a key.
    pub fn new(masters: &[ArtistMaster]) -> Self {
        let mut registry = Self::default();
        for master in masters {
            let key = artist_key(&master.artist);
            if key.is_empty() {
                continue;
            }
            if registry.by_name.contains_key(&key) {
                debug!(artist = %master.artist, "Duplicate registry name ignored");
                continue;
            }
            let idx = registry.entries.len();
            registry.entries.push((master.artist.trim().to_string(), key.clone()));
            registry.by_name.insert(key, idx);
            for alias in &master.grouped {
                let alias_key = artist_key(alias);
                if !alias_key.is_empty() {
                    registry.by_alias.entry(alias_key).or_insert(idx);
                }
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical name for cleaned artist text.
    ///
    /// Exact name, then exact alias, then the first canonical name (registry
    /// order) contained in the text: "Orquesta Tipica Carlos Di Sarli" resolves
    /// to "Carlos Di Sarli".
    pub fn resolve(&self, cleaned_artist: &str) -> Option<&str> {
        let key = artist_key(cleaned_artist);
        if key.is_empty() {
            return None;
        }
        let idx = self
            .by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .copied()
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|(_, name_key)| key.contains(name_key.as_str()))
            })?;
        Some(self.entries[idx].0.as_str())
    }
}

/// Merge raw registry rows into one entry per trimmed name.
///
/// The first occurrence keeps its level; `active` is true if any occurrence is
/// active; aliases are unioned in first-seen order.
pub fn consolidate_artists(raw: &[ArtistMaster]) -> Vec<ArtistMaster> {
    let mut merged: Vec<ArtistMaster> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for record in raw {
        let name = record.artist.trim();
        if name.is_empty() {
            continue;
        }
        match index.get(name) {
            Some(&idx) => {
                let entry = &mut merged[idx];
                if record.is_active() {
                    entry.active = "true".to_string();
                }
                for alias in &record.grouped {
                    if !entry.grouped.contains(alias) {
                        entry.grouped.push(alias.clone());
                    }
                }
            }
            None => {
                index.insert(name.to_string(), merged.len());
                let mut grouped = Vec::new();
                for alias in &record.grouped {
                    if !grouped.contains(alias) {
                        grouped.push(alias.clone());
                    }
                }
                merged.push(ArtistMaster {
                    artist: name.to_string(),
                    active: if record.is_active() { "true" } else { "false" }.to_string(),
                    level: record.level.clone(),
                    grouped,
                });
            }
        }
    }
    merged
}

/// Registry seed from distinct cleaned artist names, sorted.
pub fn seed_registry<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ArtistMaster> {
    let distinct: BTreeSet<&str> = names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    distinct.into_iter().map(ArtistMaster::new).collect()
}

/// Names that appear more than once under case-insensitive comparison.
pub fn duplicate_names(masters: &[ArtistMaster]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut duplicates = Vec::new();
    for master in masters {
        let key = artist_key(&master.artist);
        if !key.is_empty() && !seen.insert(key) {
            duplicates.push(master.artist.clone());
        }
    }
    duplicates
}
