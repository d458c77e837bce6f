//! songID generation.

use sha2::{Digest, Sha256};
use std::fmt::Write;
use uuid::Uuid;

/// Separator between album and title in the hashed input, so that
/// ("ab", "c") and ("a", "bc") never collide.
const FIELD_SEPARATOR: char = '\u{1f}';

/// How songIDs are produced during library cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// A fresh random id per song; ids change on every run.
    Random,
    /// Derived from the original album and title, stable across runs.
    #[default]
    ContentHash,
}

impl IdStrategy {
    /// 32 lowercase hex characters for either strategy.
    pub fn generate(self, album_original: &str, title_original: &str) -> String {
        match self {
            IdStrategy::Random => Uuid::new_v4().simple().to_string(),
            IdStrategy::ContentHash => content_hash_id(album_original, title_original),
        }
    }
}

/// First 128 bits of SHA-256 over `album ␟ title`, as hex.
pub fn content_hash_id(album_original: &str, title_original: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(album_original.as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(title_original.as_bytes());
    let digest = hasher.finalize();

    let mut id = String::with_capacity(32);
    for byte in &digest[..16] {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = IdStrategy::ContentHash.generate("Poema", "Poema");
        let b = IdStrategy::ContentHash.generate("Poema", "Poema");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_content_hash_field_boundary() {
        assert_ne!(content_hash_id("ab", "c"), content_hash_id("a", "bc"));
        assert_ne!(content_hash_id("Poema", "Vida mia"), content_hash_id("Vida mia", "Poema"));
    }

    #[test]
    fn test_content_hash_uses_original_text() {
        // Accented and stripped spellings are different inputs
        assert_ne!(content_hash_id("", "Canción"), content_hash_id("", "Cancion"));
    }

    #[test]
    fn test_random_ids_differ() {
        let a = IdStrategy::Random.generate("Poema", "Poema");
        let b = IdStrategy::Random.generate("Poema", "Poema");
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(!a.contains('-'));
    }
}
