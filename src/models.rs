//! Core data models for the tango catalog pipeline.
//!
//! Every external JSON shape has an explicit struct here. Input structs are
//! lenient at the boundary (numbers may arrive as strings, text may be `null`)
//! so that one bad field degrades to a default instead of failing the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Lenient field decoding
// ============================================================================

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any scalar as a string; `null` becomes empty.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => String::new(),
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn opt_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .or_else(|| n.as_f64().map(|f| f.round() as i32)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i32>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i32))
            }
            _ => None,
        })
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(opt_f64_value(Value::deserialize(d)?).map(|f| f.round() as i64))
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(opt_f64_value(Value::deserialize(d)?))
    }

    fn opt_f64_value(v: Value) -> Option<f64> {
        match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|f: &f64| f.is_finite())
    }

    /// A list of strings, a single string, or `null`.
    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Value::String(s) if !s.trim().is_empty() => vec![s],
            _ => Vec::new(),
        })
    }
}

// ============================================================================
// Catalog Export Models
// ============================================================================

/// One row of the DJ library export, or one entry of the track-location index.
///
/// Both files share the `id` key; fields a file does not carry stay at their
/// defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub album: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub artist: String,
    #[serde(default, alias = "albumArtist", deserialize_with = "lenient::string")]
    pub album_artist: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub composer: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub genre: String,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(default, alias = "durationSeconds", deserialize_with = "lenient::opt_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub filename: String,
    /// `None` when missing or not a valid integer; such records never win a size comparison.
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: String,
}

// ============================================================================
// Normalized Catalog Models
// ============================================================================

/// Dance style, chosen from the genre text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Style {
    Tango,
    Vals,
    Milonga,
    Marcha,
    #[default]
    Unknown,
}

impl Style {
    pub fn as_str(self) -> &'static str {
        match self {
            Style::Tango => "Tango",
            Style::Vals => "Vals",
            Style::Milonga => "Milonga",
            Style::Marcha => "Marcha",
            Style::Unknown => "Unknown",
        }
    }
}

impl<'de> Deserialize<'de> for Style {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(match value.as_str() {
            "Tango" => Style::Tango,
            "Vals" => Style::Vals,
            "Milonga" => Style::Milonga,
            "Marcha" => Style::Marcha,
            _ => Style::Unknown,
        })
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean stored as `"Y"` / `"N"` in the catalog files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Flag {
    #[serde(rename = "Y")]
    Yes,
    #[default]
    #[serde(rename = "N")]
    No,
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(Flag::from(value.trim().eq_ignore_ascii_case("y")))
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value {
            Flag::Yes
        } else {
            Flag::No
        }
    }
}

/// Cleaned catalog entry derived from one [`CatalogRecord`].
///
/// Text fields come in cleaning levels: `Original` as exported, `CleanL1`
/// diacritic-stripped, `CleanL2` further normalized (brackets removed for the
/// album, surname reordered for the artist).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TangoSong {
    #[serde(rename = "songID")]
    pub song_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub dj_id: String,

    #[serde(deserialize_with = "lenient::string")]
    pub song_title_original: String,
    pub song_title_clean_l1: String,

    #[serde(deserialize_with = "lenient::string")]
    pub album_title_original: String,
    pub album_title_clean_l1: String,
    pub album_title_clean_l2: String,

    #[serde(deserialize_with = "lenient::string")]
    pub artist_original: String,
    pub artist_clean_l1: String,
    pub artist_clean_l2: String,

    #[serde(deserialize_with = "lenient::string")]
    pub artist2_original: String,
    pub artist2_clean_l1: String,

    #[serde(deserialize_with = "lenient::string")]
    pub composer_original: String,
    pub composer_clean_l1: String,

    #[serde(deserialize_with = "lenient::opt_i32")]
    pub year: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub duration: Option<i64>,
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub bpm: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub genre: String,

    pub artist_master: String,

    #[serde(rename = "Style1")]
    pub style1: Style,
    #[serde(rename = "Alternative")]
    pub alternative: Flag,
    #[serde(rename = "Candombe")]
    pub candombe: Flag,
    #[serde(rename = "Cancion")]
    pub cancion: Flag,
}

// ============================================================================
// Artist Registry Models
// ============================================================================

fn inactive() -> String {
    "false".to_string()
}

/// Entry of the curated canonical artist registry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtistMaster {
    #[serde(default, alias = "name", deserialize_with = "lenient::string")]
    pub artist: String,
    #[serde(default = "inactive", deserialize_with = "lenient::string")]
    pub active: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub level: String,
    /// Alias spellings that resolve to `artist`.
    #[serde(default, alias = "similars", deserialize_with = "lenient::string_list")]
    pub grouped: Vec<String>,
}

impl ArtistMaster {
    pub fn new(artist: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            active: "true".to_string(),
            level: String::new(),
            grouped: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.trim().eq_ignore_ascii_case("true")
    }
}

/// Original artist text that resolved to no registry entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct NotFoundArtist {
    pub artist: String,
}

// ============================================================================
// On-disk Files and Match Results
// ============================================================================

/// Audio file discovered under the source directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl AudioFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = file_name_of(&path);
        Self {
            path,
            name,
            size_bytes,
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lower-cased extension, `mp3` when the file has none.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "mp3".to_string())
}

/// Why a file did not make it into the final catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnmatchReason {
    /// No catalog record shares the file's join key.
    NoKeyMatch,
    /// Candidates exist but none has a usable filesize.
    NoSizeMatch,
    /// The chosen record's id is not in the normalized catalog.
    #[serde(rename = "NoSongIDMapping")]
    NoSongIdMapping,
    /// An earlier file already claimed the same songID.
    AlreadyMatched,
    /// The songID has no entry in the normalized catalog.
    NoMetadata,
    /// Copying into the target directory failed.
    CopyFailed,
}

impl UnmatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnmatchReason::NoKeyMatch => "NoKeyMatch",
            UnmatchReason::NoSizeMatch => "NoSizeMatch",
            UnmatchReason::NoSongIdMapping => "NoSongIDMapping",
            UnmatchReason::AlreadyMatched => "AlreadyMatched",
            UnmatchReason::NoMetadata => "NoMetadata",
            UnmatchReason::CopyFailed => "CopyFailed",
        }
    }
}

impl fmt::Display for UnmatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file associated with exactly one songID.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedFile {
    #[serde(rename = "songID")]
    pub song_id: String,
    /// Filename as recorded by the catalog.
    pub filename: String,
    pub filepath: PathBuf,
    pub filesize: u64,
    pub dj_id: String,
    pub size_diff: u64,
}

/// Diagnostic entry of the unmatched report.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedFile {
    pub filename: String,
    pub path: PathBuf,
    pub reason: UnmatchReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dj_id: Option<String>,
    #[serde(default, rename = "songID", skip_serializing_if = "Option::is_none")]
    pub song_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closest_similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UnmatchedFile {
    pub fn new(path: &Path, reason: UnmatchReason) -> Self {
        Self {
            filename: file_name_of(path),
            path: path.to_path_buf(),
            reason,
            candidates: None,
            dj_id: None,
            song_id: None,
            closest_key: None,
            closest_similarity: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Turn a match that failed later in the pipeline back into a diagnostic.
    pub fn from_match(matched: &MatchedFile, reason: UnmatchReason) -> Self {
        let mut entry = Self::new(&matched.filepath, reason);
        entry.dj_id = Some(matched.dj_id.clone());
        entry.song_id = Some(matched.song_id.clone());
        entry
    }
}

/// Outcome of matching one file.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchResult {
    Matched(MatchedFile),
    Unmatched(UnmatchedFile),
}

// ============================================================================
// Output Models
// ============================================================================

/// Song entry of the final catalog consumed by the app.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct OutputSong {
    #[serde(rename = "SongID")]
    pub song_id: String,
    pub title: String,
    pub orchestra: String,
    pub album: String,
    pub artist_master: String,
    pub audio_url: String,
    pub composer: String,
    pub year: Option<i32>,
    pub style: Style,
    pub alternative: Flag,
    pub candombe: Flag,
    pub cancion: Flag,
    /// Always empty; filled in by hand downstream.
    pub singer: String,
}

/// Top-level shape of the final song catalog file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SongCatalog {
    pub songs: Vec<OutputSong>,
}

/// Embedded tags of one audio file, as dumped by `extract-tags`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagDump {
    pub filename: String,
    pub filename_clean_l1: String,
    pub attributes: BTreeMap<String, String>,
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters produced by the matcher.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub files: usize,
    pub matched: usize,
    pub no_key_match: usize,
    pub no_size_match: usize,
    pub no_song_id_mapping: usize,
    pub already_matched: usize,

    /// Files whose key hit more than one catalog record.
    pub multi_candidate_files: usize,
    pub suggestions: usize,

    // Size difference of the chosen candidate
    pub size_exact: usize,
    pub size_within_1k: usize,
    pub size_within_64k: usize,
    pub size_within_1m: usize,
    pub size_beyond_1m: usize,
}

impl MatchStats {
    pub fn record_unmatched(&mut self, reason: UnmatchReason) {
        match reason {
            UnmatchReason::NoKeyMatch => self.no_key_match += 1,
            UnmatchReason::NoSizeMatch => self.no_size_match += 1,
            UnmatchReason::NoSongIdMapping => self.no_song_id_mapping += 1,
            UnmatchReason::AlreadyMatched => self.already_matched += 1,
            // Not produced by the matcher
            UnmatchReason::NoMetadata | UnmatchReason::CopyFailed => {}
        }
    }

    /// Record the byte difference between the chosen record and the file on disk.
    pub fn record_size_bucket(&mut self, diff: u64) {
        match diff {
            0 => self.size_exact += 1,
            1..=1_024 => self.size_within_1k += 1,
            1_025..=65_536 => self.size_within_64k += 1,
            65_537..=1_048_576 => self.size_within_1m += 1,
            _ => self.size_beyond_1m += 1,
        }
    }

    pub fn unmatched(&self) -> usize {
        self.no_key_match + self.no_size_match + self.no_song_id_mapping + self.already_matched
    }

    /// Match rate as a percentage of discovered files.
    pub fn match_rate(&self) -> f64 {
        if self.files == 0 {
            0.0
        } else {
            100.0 * self.matched as f64 / self.files as f64
        }
    }
}

/// Counters produced by the assembler.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembleStats {
    pub songs: usize,
    pub copied: usize,
    pub tagged: usize,
    pub tag_failures: usize,
    pub copy_failures: usize,
    pub no_metadata: usize,
}

/// Everything a full run reports, written with `--stats`.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub matching: MatchStats,
    pub assembly: AssembleStats,
    pub matched: usize,
    pub unmatched: usize,
    pub elapsed_seconds: f64,
}
