//! File-system and tag collaborators.
//!
//! Directory traversal, copying and tag access are kept behind small functions
//! and the [`Tagger`] trait so the matcher and assembler stay testable without
//! real audio files.

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Accessor, Tag, TagExt};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{InputError, InputResult, TagError};
use crate::models::AudioFile;

// ============================================================================
// Traversal
// ============================================================================

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Regular files under `root` with one of `extensions` (case-insensitive),
/// sorted by path.
pub fn list_files(root: &Path, extensions: &[String]) -> InputResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(InputError::Read {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// [`list_files`] plus sizes. A file that cannot be stat'ed is kept with size 0.
pub fn discover_audio_files(root: &Path, extensions: &[String]) -> InputResult<Vec<AudioFile>> {
    let files = list_files(root, extensions)?
        .into_iter()
        .map(|path| {
            let size = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot read file size");
                    0
                }
            };
            AudioFile::new(path, size)
        })
        .collect();
    Ok(files)
}

/// Copy `src` to `dst`, replacing any existing file.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<u64> {
    fs::copy(src, dst)
}

// ============================================================================
// Tagging
// ============================================================================

/// Descriptive tags written into a copied file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub comment: String,
}

/// Tag access on audio files.
pub trait Tagger {
    /// All text tags of a file, keyed by tag name.
    fn extract_tags(&self, path: &Path) -> Result<BTreeMap<String, String>, TagError>;

    /// Set the given fields, keeping other tags. Empty fields are not written.
    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), TagError>;
}

/// [`Tagger`] backed by lofty; handles MP3, FLAC, M4A, OGG and WAV alike.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagger;

impl Tagger for LoftyTagger {
    fn extract_tags(&self, path: &Path) -> Result<BTreeMap<String, String>, TagError> {
        let read_error = |message: String| TagError::Read {
            path: path.to_path_buf(),
            message,
        };
        let tagged_file = Probe::open(path)
            .map_err(|e| read_error(e.to_string()))?
            .read()
            .map_err(|e| read_error(e.to_string()))?;

        let mut attributes = BTreeMap::new();
        for tag in tagged_file.tags() {
            for item in tag.items() {
                if let Some(text) = item.value().text() {
                    attributes
                        .entry(format!("{:?}", item.key()))
                        .or_insert_with(|| text.to_string());
                }
            }
        }
        Ok(attributes)
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), TagError> {
        let write_error = |message: String| TagError::Write {
            path: path.to_path_buf(),
            message,
        };
        let mut tagged_file = Probe::open(path)
            .map_err(|e| write_error(e.to_string()))?
            .read()
            .map_err(|e| write_error(e.to_string()))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let Some(tag) = tagged_file.tag_mut(tag_type) else {
            return Err(write_error(format!("no {:?} tag available", tag_type)));
        };

        if !fields.title.is_empty() {
            tag.set_title(fields.title.clone());
        }
        if !fields.album.is_empty() {
            tag.set_album(fields.album.clone());
        }
        if !fields.artist.is_empty() {
            tag.set_artist(fields.artist.clone());
        }
        if !fields.genre.is_empty() {
            tag.set_genre(fields.genre.clone());
        }
        if !fields.comment.is_empty() {
            tag.set_comment(fields.comment.clone());
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| write_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b/Two.MP3"), 1);
        touch(&dir.path().join("a/one.mp3"), 1);
        touch(&dir.path().join("a/cover.jpg"), 1);
        touch(&dir.path().join("c.m4a"), 1);

        let files = list_files(dir.path(), &["mp3".to_string()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a/one.mp3", "b/Two.MP3"]);
    }

    #[test]
    fn test_list_files_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_files(&dir.path().join("nope"), &["mp3".to_string()]).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }

    #[test]
    fn test_discover_reads_sizes() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("poema.mp3"), 1234);
        let files = discover_audio_files(dir.path(), &["mp3".to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "poema.mp3");
        assert_eq!(files[0].size_bytes, 1234);
    }

    #[test]
    fn test_copy_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.mp3");
        let dst = dir.path().join("dst.mp3");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old contents").unwrap();
        assert_eq!(copy_file(&src, &dst).unwrap(), 3);
        assert_eq!(fs::read(&dst).unwrap(), b"new");
        assert!(copy_file(&dir.path().join("missing.mp3"), &dst).is_err());
    }

    #[test]
    fn test_lofty_rejects_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"not audio at all").unwrap();

        let err = LoftyTagger.extract_tags(&path).unwrap_err();
        assert!(matches!(err, TagError::Read { .. }));
        assert_eq!(err.path(), &path);

        let err = LoftyTagger
            .write_tags(&path, &TagFields::default())
            .unwrap_err();
        assert!(matches!(err, TagError::Write { .. }));
    }
}
