//! Explicit run configuration.
//!
//! Binaries build these from their CLI arguments and hand them to each stage.
//! Nothing in the library reads process-wide settings.

use std::path::{Path, PathBuf};

use crate::error::{InputError, InputResult};
use crate::song_id::IdStrategy;

/// Where matched copies are served from.
pub const DEFAULT_AUDIO_BASE_URL: &str = "https://namethattangotune.blob.core.windows.net/djsongs";

/// How an on-disk file and a catalog record are joined.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JoinKey {
    /// The file name alone, diacritic-stripped.
    #[default]
    Filename,
    /// The path below the first `pivot` directory, so same-named files in
    /// different folders stay apart.
    PathSuffix { pivot: String },
}

impl JoinKey {
    pub fn validate(&self) -> InputResult<()> {
        match self {
            JoinKey::PathSuffix { pivot } if pivot.trim().is_empty() => Err(InputError::Config(
                "path-suffix join key needs a non-empty pivot directory".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub join_key: JoinKey,
    /// Report the closest catalog key for files with no key match.
    pub suggest: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            join_key: JoinKey::Filename,
            suggest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembleConfig {
    pub target_dir: PathBuf,
    pub audio_base_url: String,
    pub write_tags: bool,
}

impl AssembleConfig {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            audio_base_url: DEFAULT_AUDIO_BASE_URL.to_string(),
            write_tags: true,
        }
    }

    /// Public URL of a copied file.
    pub fn audio_url(&self, song_id: &str, extension: &str) -> String {
        format!(
            "{}/{}.{}",
            self.audio_base_url.trim_end_matches('/'),
            song_id,
            extension
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanConfig {
    pub id_strategy: IdStrategy,
}

/// Everything one `tango-match` run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Normalized catalog (TangoSong array) produced by library cleaning.
    pub songs_path: PathBuf,
    /// Catalog records carrying `filename`/`filesize`/`location`.
    pub catalog_path: PathBuf,
    pub source_dir: PathBuf,
    pub extensions: Vec<String>,

    pub output_path: PathBuf,
    pub matched_path: PathBuf,
    pub unmatched_path: PathBuf,
    pub stats_path: Option<PathBuf>,

    pub matching: MatchConfig,
    pub assembly: AssembleConfig,

    /// Remove and recreate the target directory before copying.
    pub clean_target: bool,
    /// Periodic log lines instead of progress bars.
    pub log_only: bool,
}

impl RunConfig {
    pub fn validate(&self) -> InputResult<()> {
        self.matching.join_key.validate()?;
        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(InputError::Config(
                "at least one file extension is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn input_paths(&self) -> [&Path; 2] {
        [self.songs_path.as_path(), self.catalog_path.as_path()]
    }

    pub fn output_paths(&self) -> Vec<&Path> {
        let mut paths = vec![
            self.output_path.as_path(),
            self.matched_path.as_path(),
            self.unmatched_path.as_path(),
        ];
        if let Some(stats) = &self.stats_path {
            paths.push(stats.as_path());
        }
        paths
    }
}

/// Split a comma-separated extension list: "mp3, .M4A" → ["mp3", "m4a"].
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_suffix_requires_pivot() {
        let key = JoinKey::PathSuffix { pivot: "  ".into() };
        assert!(matches!(key.validate(), Err(InputError::Config(_))));
        let key = JoinKey::PathSuffix {
            pivot: "Music".into(),
        };
        assert!(key.validate().is_ok());
        assert!(JoinKey::Filename.validate().is_ok());
    }

    #[test]
    fn test_audio_url() {
        let mut config = AssembleConfig::new("/tmp/out");
        assert_eq!(
            config.audio_url("abc", "mp3"),
            "https://namethattangotune.blob.core.windows.net/djsongs/abc.mp3"
        );
        config.audio_base_url = "https://cdn.example.org/songs/".into();
        assert_eq!(config.audio_url("abc", "m4a"), "https://cdn.example.org/songs/abc.m4a");
    }

    #[test]
    fn test_parse_extensions() {
        assert_eq!(parse_extensions("mp3, .M4A,,"), vec!["mp3", "m4a"]);
        assert!(parse_extensions(" , ").is_empty());
    }
}
