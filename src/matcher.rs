//! Record matcher: on-disk audio files to catalog records.
//!
//! Two phases per file. The join key (file name, or path below a pivot
//! directory) selects candidate records; the candidate with the closest
//! filesize wins. The winner's id is then mapped to a songID through the
//! normalized catalog. Every file ends up either matched or in the unmatched
//! report with a reason; nothing is dropped and nothing is fatal.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::config::{JoinKey, MatchConfig};
use crate::models::{
    AudioFile, CatalogRecord, MatchResult, MatchStats, MatchedFile, TangoSong, UnmatchReason,
    UnmatchedFile,
};
use crate::normalize::{normalize_filename, path_suffix_key};
use crate::scoring::{closest_key, select_closest};

// ============================================================================
// Join Keys
// ============================================================================

/// Last path segment, accepting both separators.
fn last_segment(location: &str) -> &str {
    location
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or("")
}

/// Join key of a catalog record, `None` when the record cannot be joined.
///
/// For filename keys a record without `filename` falls back to the last
/// segment of its `location`.
pub fn record_key(record: &CatalogRecord, join_key: &JoinKey) -> Option<String> {
    match join_key {
        JoinKey::Filename => {
            let name = if record.filename.trim().is_empty() {
                last_segment(&record.location)
            } else {
                record.filename.as_str()
            };
            (!name.is_empty()).then(|| normalize_filename(name))
        }
        JoinKey::PathSuffix { pivot } => path_suffix_key(&record.location, pivot),
    }
}

/// Join key of an on-disk file, derived the same way as [`record_key`].
pub fn file_key(file: &AudioFile, join_key: &JoinKey) -> Option<String> {
    match join_key {
        JoinKey::Filename => (!file.name.is_empty()).then(|| normalize_filename(&file.name)),
        JoinKey::PathSuffix { pivot } => path_suffix_key(&file.path.to_string_lossy(), pivot),
    }
}

// ============================================================================
// Lookup Structures
// ============================================================================

/// Catalog records grouped by join key.
pub struct CatalogIndex<'a> {
    records: &'a [CatalogRecord],
    by_key: FxHashMap<String, Vec<usize>>,
    /// Sorted, for deterministic suggestions.
    keys: Vec<String>,
    unkeyed: usize,
}

impl<'a> CatalogIndex<'a> {
    pub fn build(records: &'a [CatalogRecord], join_key: &JoinKey) -> Self {
        let mut by_key: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut unkeyed = 0;
        for (idx, record) in records.iter().enumerate() {
            match record_key(record, join_key) {
                Some(key) => by_key.entry(key).or_default().push(idx),
                None => unkeyed += 1,
            }
        }
        let mut keys: Vec<String> = by_key.keys().cloned().collect();
        keys.sort_unstable();
        Self {
            records,
            by_key,
            keys,
            unkeyed,
        }
    }

    /// Records sharing `key`, in catalog order.
    pub fn candidates(&self, key: &str) -> Vec<&'a CatalogRecord> {
        let records = self.records;
        self.by_key
            .get(key)
            .map(|indices| indices.iter().map(|&i| &records[i]).collect())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Records without a usable join key.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

/// Catalog id → songID, built from the normalized catalog.
#[derive(Debug, Default)]
pub struct SongIdMap {
    by_dj_id: FxHashMap<String, String>,
}

impl SongIdMap {
    /// Later songs overwrite earlier ones sharing a `djId`.
    pub fn from_songs(songs: &[TangoSong]) -> Self {
        let mut by_dj_id = FxHashMap::default();
        let mut overwritten = 0usize;
        for song in songs {
            let dj_id = song.dj_id.trim();
            if dj_id.is_empty() || song.song_id.is_empty() {
                continue;
            }
            if by_dj_id
                .insert(dj_id.to_string(), song.song_id.clone())
                .is_some()
            {
                overwritten += 1;
            }
        }
        if overwritten > 0 {
            warn!(overwritten, "Duplicate djId in normalized catalog, last entry wins");
        }
        Self { by_dj_id }
    }

    pub fn get(&self, dj_id: &str) -> Option<&str> {
        self.by_dj_id.get(dj_id.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_dj_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dj_id.is_empty()
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Both partitions plus counters.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedFile>,
    pub unmatched: Vec<UnmatchedFile>,
    pub stats: MatchStats,
}

/// Stateful single pass over discovered files.
///
/// A songID is claimed by the first file that resolves to it; later files
/// resolving to the same songID are reported as [`UnmatchReason::AlreadyMatched`].
pub struct Matcher<'a> {
    index: CatalogIndex<'a>,
    song_ids: &'a SongIdMap,
    config: &'a MatchConfig,
    claimed: FxHashSet<String>,
    stats: MatchStats,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a [CatalogRecord], song_ids: &'a SongIdMap, config: &'a MatchConfig) -> Self {
        let index = CatalogIndex::build(catalog, &config.join_key);
        debug!(
            keys = index.key_count(),
            unkeyed = index.unkeyed(),
            "Catalog index built"
        );
        Self {
            index,
            song_ids,
            config,
            claimed: FxHashSet::default(),
            stats: MatchStats::default(),
        }
    }

    pub fn into_stats(self) -> MatchStats {
        self.stats
    }

    fn unmatched(&mut self, file: &AudioFile, reason: UnmatchReason) -> UnmatchedFile {
        self.stats.record_unmatched(reason);
        debug!(file = %file.name, %reason, "No match");
        UnmatchedFile::new(&file.path, reason)
    }

    fn no_key_match(&mut self, file: &AudioFile, key: Option<&str>) -> UnmatchedFile {
        let mut entry = self.unmatched(file, UnmatchReason::NoKeyMatch);
        match key {
            None => entry.detail = Some("no join key could be derived from the path".to_string()),
            Some(key) if self.config.suggest => {
                if let Some((closest, similarity)) = closest_key(key, self.index.keys()) {
                    entry.closest_key = Some(closest.to_string());
                    entry.closest_similarity = Some((similarity * 1000.0).round() / 1000.0);
                    self.stats.suggestions += 1;
                }
            }
            Some(_) => {}
        }
        entry
    }

    /// Match one file. Must be called in discovery order.
    pub fn match_file(&mut self, file: &AudioFile) -> MatchResult {
        self.stats.files += 1;

        let key = file_key(file, &self.config.join_key);
        let candidates = key
            .as_deref()
            .map(|k| self.index.candidates(k))
            .unwrap_or_default();
        if candidates.is_empty() {
            return MatchResult::Unmatched(self.no_key_match(file, key.as_deref()));
        }
        if candidates.len() > 1 {
            self.stats.multi_candidate_files += 1;
        }

        let Some((record, size_diff)) = select_closest(candidates.iter().copied(), file.size_bytes)
        else {
            let mut entry = self.unmatched(file, UnmatchReason::NoSizeMatch);
            entry.candidates = Some(candidates.len());
            return MatchResult::Unmatched(entry);
        };

        let Some(song_id) = self.song_ids.get(&record.id).map(str::to_string) else {
            let mut entry = self.unmatched(file, UnmatchReason::NoSongIdMapping);
            entry.candidates = Some(candidates.len());
            entry.dj_id = Some(record.id.clone());
            return MatchResult::Unmatched(entry);
        };

        if !self.claimed.insert(song_id.clone()) {
            let mut entry = self.unmatched(file, UnmatchReason::AlreadyMatched);
            entry.candidates = Some(candidates.len());
            entry.dj_id = Some(record.id.clone());
            entry.song_id = Some(song_id);
            return MatchResult::Unmatched(entry);
        }

        self.stats.matched += 1;
        self.stats.record_size_bucket(size_diff);
        debug!(file = %file.name, %song_id, size_diff, "Matched");

        let filename = if record.filename.is_empty() {
            file.name.clone()
        } else {
            record.filename.clone()
        };
        MatchResult::Matched(MatchedFile {
            song_id,
            filename,
            filepath: file.path.clone(),
            filesize: file.size_bytes,
            dj_id: record.id.clone(),
            size_diff,
        })
    }
}

/// Match every file in order and split the results.
pub fn match_files(
    files: &[AudioFile],
    catalog: &[CatalogRecord],
    song_ids: &SongIdMap,
    config: &MatchConfig,
) -> MatchOutcome {
    match_files_with_progress(files, catalog, song_ids, config, |_| {})
}

/// [`match_files`], calling `on_file` with the count done after each file.
pub fn match_files_with_progress(
    files: &[AudioFile],
    catalog: &[CatalogRecord],
    song_ids: &SongIdMap,
    config: &MatchConfig,
    mut on_file: impl FnMut(usize),
) -> MatchOutcome {
    let mut matcher = Matcher::new(catalog, song_ids, config);
    let mut outcome = MatchOutcome::default();
    for (i, file) in files.iter().enumerate() {
        match matcher.match_file(file) {
            MatchResult::Matched(m) => outcome.matched.push(m),
            MatchResult::Unmatched(u) => outcome.unmatched.push(u),
        }
        on_file(i + 1);
    }
    outcome.stats = matcher.into_stats();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(id: &str, filename: &str, filesize: Option<u64>) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            filename: filename.into(),
            filesize,
            ..Default::default()
        }
    }

    fn located(id: &str, location: &str, filesize: u64) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            filename: last_segment(location).into(),
            filesize: Some(filesize),
            location: location.into(),
            ..Default::default()
        }
    }

    fn song(dj_id: &str, song_id: &str) -> TangoSong {
        TangoSong {
            dj_id: dj_id.into(),
            song_id: song_id.into(),
            ..Default::default()
        }
    }

    fn file(path: &str, size: u64) -> AudioFile {
        AudioFile::new(PathBuf::from(path), size)
    }

    #[test]
    fn test_closest_filesize_wins() {
        let catalog = vec![
            record("1", "poema.mp3", Some(1000)),
            record("2", "poema.mp3", Some(2000)),
        ];
        let songs = SongIdMap::from_songs(&[song("1", "s1"), song("2", "s2")]);
        let outcome = match_files(
            &[file("/music/poema.mp3", 1050)],
            &catalog,
            &songs,
            &MatchConfig::default(),
        );
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].song_id, "s1");
        assert_eq!(outcome.matched[0].dj_id, "1");
        assert_eq!(outcome.matched[0].size_diff, 50);
        assert_eq!(outcome.stats.multi_candidate_files, 1);
        assert_eq!(outcome.stats.size_within_1k, 1);
    }

    #[test]
    fn test_no_key_match_with_suggestion() {
        let catalog = vec![record("1", "La Cumparsita.mp3", Some(10))];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let outcome = match_files(
            &[file("/music/La Cumparsita .mp3", 10), file("/music/zzz.mp3", 10)],
            &catalog,
            &songs,
            &MatchConfig::default(),
        );
        assert!(outcome.matched.is_empty());
        let first = &outcome.unmatched[0];
        assert_eq!(first.reason, UnmatchReason::NoKeyMatch);
        assert_eq!(first.closest_key.as_deref(), Some("La Cumparsita.mp3"));
        assert!(outcome.unmatched[1].closest_key.is_none());
        assert_eq!(outcome.stats.no_key_match, 2);
        assert_eq!(outcome.stats.suggestions, 1);
    }

    #[test]
    fn test_suggestions_can_be_disabled() {
        let catalog = vec![record("1", "La Cumparsita.mp3", Some(10))];
        let songs = SongIdMap::default();
        let config = MatchConfig {
            suggest: false,
            ..Default::default()
        };
        let outcome = match_files(&[file("/m/La Cumparsita .mp3", 10)], &catalog, &songs, &config);
        assert!(outcome.unmatched[0].closest_key.is_none());
    }

    #[test]
    fn test_no_size_match() {
        let catalog = vec![record("1", "a.mp3", None), record("2", "a.mp3", None)];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let outcome = match_files(&[file("/m/a.mp3", 0)], &catalog, &songs, &MatchConfig::default());
        assert_eq!(outcome.unmatched[0].reason, UnmatchReason::NoSizeMatch);
        assert_eq!(outcome.unmatched[0].candidates, Some(2));
    }

    #[test]
    fn test_no_song_id_mapping() {
        let catalog = vec![record("9", "a.mp3", Some(5))];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let outcome = match_files(&[file("/m/a.mp3", 5)], &catalog, &songs, &MatchConfig::default());
        let entry = &outcome.unmatched[0];
        assert_eq!(entry.reason, UnmatchReason::NoSongIdMapping);
        assert_eq!(entry.dj_id.as_deref(), Some("9"));
    }

    #[test]
    fn test_song_id_claimed_once() {
        let catalog = vec![record("1", "a.mp3", Some(5))];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let files = [file("/m/one/a.mp3", 5), file("/m/two/a.mp3", 5)];
        let outcome = match_files(&files, &catalog, &songs, &MatchConfig::default());
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].filepath, PathBuf::from("/m/one/a.mp3"));
        assert_eq!(outcome.unmatched[0].reason, UnmatchReason::AlreadyMatched);
        assert_eq!(outcome.unmatched[0].song_id.as_deref(), Some("s1"));
        assert_eq!(outcome.stats.already_matched, 1);
    }

    #[test]
    fn test_path_suffix_disambiguates() {
        let catalog = vec![
            located("1", "C:\\Users\\dj\\Music\\Canaro\\Poema.mp3", 1000),
            located("2", "C:\\Users\\dj\\Music\\Troilo\\Poema.mp3", 1000),
        ];
        let songs = SongIdMap::from_songs(&[song("1", "s1"), song("2", "s2")]);
        let config = MatchConfig {
            join_key: JoinKey::PathSuffix {
                pivot: "music".into(),
            },
            suggest: true,
        };
        let files = [
            file("/mnt/backup/Music/troilo/poema.mp3", 1000),
            file("/mnt/backup/Other/Canaro/Poema.mp3", 1000),
        ];
        let outcome = match_files(&files, &catalog, &songs, &config);
        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].song_id, "s2");
        assert_eq!(outcome.unmatched[0].reason, UnmatchReason::NoKeyMatch);
        assert!(outcome.unmatched[0].detail.is_some());
    }

    #[test]
    fn test_filename_key_ignores_normalization_form() {
        let catalog = vec![record("1", "Canción.mp3", Some(3))];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        // Decomposed spelling as reported by some filesystems
        let outcome = match_files(
            &[file("/m/Cancio\u{301}n.mp3", 3)],
            &catalog,
            &songs,
            &MatchConfig::default(),
        );
        assert_eq!(outcome.matched.len(), 1);
    }

    #[test]
    fn test_filename_falls_back_to_location() {
        let mut rec = located("1", "/old/library/Poema.mp3", 10);
        rec.filename.clear();
        assert_eq!(record_key(&rec, &JoinKey::Filename).as_deref(), Some("Poema.mp3"));
        rec.location.clear();
        assert_eq!(record_key(&rec, &JoinKey::Filename), None);
    }

    #[test]
    fn test_every_file_accounted_for() {
        let catalog = vec![
            record("1", "a.mp3", Some(1)),
            record("2", "b.mp3", None),
            record("3", "c.mp3", Some(1)),
        ];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let files = [
            file("/m/a.mp3", 1),
            file("/m/a2/a.mp3", 1),
            file("/m/b.mp3", 1),
            file("/m/c.mp3", 1),
            file("/m/d.mp3", 1),
        ];
        let outcome = match_files(&files, &catalog, &songs, &MatchConfig::default());
        assert_eq!(outcome.matched.len() + outcome.unmatched.len(), files.len());
        assert_eq!(outcome.stats.files, files.len());
        assert_eq!(outcome.stats.matched + outcome.stats.unmatched(), files.len());
    }

    #[test]
    fn test_song_id_map_last_wins() {
        let map = SongIdMap::from_songs(&[song("7", "old"), song(" 7 ", "new"), song("", "x")]);
        assert_eq!(map.get("7"), Some("new"));
        assert_eq!(map.len(), 1);
        assert!(SongIdMap::from_songs(&[song("", "x")]).is_empty());
    }

    #[test]
    fn test_progress_reports_each_file() {
        let catalog = vec![record("1", "a.mp3", Some(1))];
        let songs = SongIdMap::from_songs(&[song("1", "s1")]);
        let files = [file("/m/a.mp3", 1), file("/m/b.mp3", 1), file("/m/c.mp3", 1)];
        let mut seen = Vec::new();
        let outcome = match_files_with_progress(
            &files,
            &catalog,
            &songs,
            &MatchConfig::default(),
            |done| seen.push(done),
        );
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(outcome.matched.len(), 1);
    }
}
