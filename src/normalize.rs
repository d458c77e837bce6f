//! Text normalization for catalog cleaning and file matching.
//!
//! Every function here is pure and total: empty input gives empty output and
//! nothing panics on odd Unicode.
//!
//! CRITICAL: the genre keyword order and the join-key rules decide which file
//! gets which songID. Changing them changes the output of re-runs.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Flag, Style};

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Square-bracket spans, non-greedy: "Poema [1935] [Remaster]" loses both.
pub static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[.*?\]\s*").unwrap());

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Anything that is neither a word character nor whitespace.
pub static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// "Surname, Given" spellings handled literally before the generic comma swap.
/// Names with a multi-word surname would otherwise depend on the word count.
pub static FIXED_SURNAME_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\bDi Sarli, Carlos\b").unwrap(), "Carlos Di Sarli"),
        (Regex::new(r"\bDe Angelis, Alfredo\b").unwrap(), "Alfredo De Angelis"),
    ]
});

/// Recurring misspellings in library exports.
pub static KNOWN_NAME_FIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![(Regex::new(r"\bOsvalo\b").unwrap(), "Osvaldo")]
});

// ============================================================================
// GENRE KEYWORDS
// ============================================================================

/// Genres kept by library cleaning.
pub const TANGO_GENRES: &[&str] = &["tango", "vals", "waltz", "milonga", "marcha"];

/// Style keywords in priority order; the first hit wins.
const STYLE_KEYWORDS: &[(&[&str], Style)] = &[
    (&["tango"], Style::Tango),
    (&["vals", "waltz"], Style::Vals),
    (&["milonga"], Style::Milonga),
    (&["marcha"], Style::Marcha),
];

pub const ALTERNATIVE_KEYWORDS: &[&str] = &["alt", "alt.", "alternative"];
pub const ALTERNATIVE_WALTZ_KEYWORDS: &[&str] = &["alt waltz", "alternative waltz"];
pub const CANDOMBE_KEYWORDS: &[&str] = &["candombe"];
/// Includes the mis-decoded UTF-8 spelling found in some exports.
pub const CANCION_KEYWORDS: &[&str] = &["canción", "cancion", "canciã³n"];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Canonical decomposition with every combining mark removed, in any script.
/// e.g., "Aníbal Troilo" → "Anibal Troilo". Case is preserved.
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Level-1 cleaning: diacritics removed, outer whitespace and leading dots dropped.
pub fn clean_text(s: &str) -> String {
    strip_diacritics(s)
        .trim()
        .trim_start_matches('.')
        .trim_start()
        .to_string()
}

/// Apply the known misspelling fixes.
pub fn apply_known_names(s: &str) -> String {
    let mut result = s.to_string();
    for (pattern, replacement) in KNOWN_NAME_FIXES.iter() {
        if pattern.is_match(&result) {
            result = pattern.replace_all(&result, *replacement).into_owned();
        }
    }
    result
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Rewrite "Surname, Given" into "Given Surname".
///
/// Fixed spellings win. Otherwise a single comma followed by at most two words
/// is swapped; anything else (several commas, long suffixes) is returned as is.
pub fn reorder_surname_first(s: &str) -> String {
    for (pattern, replacement) in FIXED_SURNAME_PATTERNS.iter() {
        if pattern.is_match(s) {
            return pattern.replace_all(s, *replacement).into_owned();
        }
    }

    let mut parts = s.split(',');
    if let (Some(before), Some(after), None) = (parts.next(), parts.next(), parts.next()) {
        if after.split_whitespace().count() <= 2 {
            return format!("{} {}", after.trim(), before.trim()).trim().to_string();
        }
    }
    s.to_string()
}

/// Remove every `[...]` span and the whitespace around it.
pub fn strip_bracketed(s: &str) -> String {
    let result = BRACKETED.replace_all(s, " ");
    MULTI_SPACE.replace_all(result.trim(), " ").into_owned()
}

/// Dance style from genre text. "Tango Vals" is a Tango.
pub fn classify_genre(genre: &str) -> Style {
    let lower = genre.to_lowercase();
    STYLE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, style)| *style)
        .unwrap_or(Style::Unknown)
}

/// Case-insensitive substring test of `genre` against any keyword.
pub fn flag_from_genre(genre: &str, keywords: &[&str]) -> bool {
    let lower = genre.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// "alt" also occurs inside "waltz", so a plain waltz is not alternative
/// unless it is spelled out as an alternative waltz.
pub fn is_alternative(genre: &str) -> bool {
    let excluded_waltz = flag_from_genre(genre, &["waltz"]);
    (flag_from_genre(genre, ALTERNATIVE_KEYWORDS) && !excluded_waltz)
        || flag_from_genre(genre, ALTERNATIVE_WALTZ_KEYWORDS)
}

/// Whether library cleaning keeps a record with this genre.
pub fn is_tango_genre(genre: &str) -> bool {
    flag_from_genre(genre, TANGO_GENRES)
}

/// The three Y/N classification flags of a genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenreFlags {
    pub alternative: Flag,
    pub candombe: Flag,
    pub cancion: Flag,
}

impl GenreFlags {
    pub fn from_genre(genre: &str) -> Self {
        Self {
            alternative: is_alternative(genre).into(),
            candombe: flag_from_genre(genre, CANDOMBE_KEYWORDS).into(),
            cancion: flag_from_genre(genre, CANCION_KEYWORDS).into(),
        }
    }
}

// ============================================================================
// JOIN KEYS
// ============================================================================

/// Join key for filename matching: diacritics stripped, case kept.
///
/// Covers the NFD names macOS reports for files whose catalog spelling is NFC.
pub fn normalize_filename(name: &str) -> String {
    strip_diacritics(name)
}

/// Join key for path-suffix matching: the path below the first `pivot`
/// directory, lower-cased and diacritic-stripped, with `/` separators.
///
/// Returns `None` when the pivot does not occur or nothing follows it.
pub fn path_suffix_key(path: &str, pivot: &str) -> Option<String> {
    let pivot = fold_segment(pivot.trim());
    if pivot.is_empty() {
        return None;
    }
    let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
    let pivot_index = segments.iter().position(|s| fold_segment(s) == pivot)?;
    let suffix = &segments[pivot_index + 1..];
    if suffix.is_empty() {
        return None;
    }
    Some(fold_segment(&suffix.join("/")))
}

fn fold_segment(s: &str) -> String {
    strip_diacritics(s).to_lowercase()
}

/// Filename with punctuation removed from the stem and spaces collapsed,
/// extension kept: "01 - Poema (1935).mp3" → "01 Poema 1935.mp3".
pub fn clean_filename(filename: &str) -> String {
    let (stem, extension) = match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    };
    let cleaned = NON_WORD.replace_all(stem, "");
    let cleaned = MULTI_SPACE.replace_all(cleaned.trim(), " ");
    format!("{}{}", cleaned, extension)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Aníbal Troilo"), "Anibal Troilo");
        assert_eq!(strip_diacritics("Canción"), "Cancion");
        assert_eq!(strip_diacritics("Pedro Láurenz"), "Pedro Laurenz");
        assert_eq!(strip_diacritics(""), "");
    }

    #[test]
    fn test_strip_diacritics_non_latin() {
        assert_eq!(strip_diacritics("\u{915}\u{93c}"), "\u{915}");
        assert_eq!(strip_diacritics("\u{5e9}\u{5b4}"), "\u{5e9}");
        assert_eq!(strip_diacritics("\u{e01}\u{e31}"), "\u{e01}");
        assert_eq!(strip_diacritics("\u{627}\u{64e}"), "\u{627}");
        // Precomposed Devanagari QA decomposes, then loses its nukta
        assert_eq!(strip_diacritics("\u{958}"), "\u{915}");
        assert_eq!(strip_diacritics("日本語"), "日本語");
    }

    #[test]
    fn test_strip_diacritics_idempotent() {
        for s in ["", "Ñoño", "a\u{0301}", "Orquesta Típica Victor", "日本語", "Å\u{030A}ngström"] {
            let once = strip_diacritics(s);
            assert_eq!(strip_diacritics(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_strip_diacritics_nfc_and_nfd_agree() {
        let nfc = "Ángel D'Agostino";
        let nfd: String = nfc.nfd().collect();
        assert_eq!(strip_diacritics(nfc), strip_diacritics(&nfd));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  ...Poema  "), "Poema");
        assert_eq!(clean_text(". Él"), "El");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_apply_known_names() {
        assert_eq!(apply_known_names("Osvalo Pugliese"), "Osvaldo Pugliese");
        assert_eq!(apply_known_names("Osvaldo Fresedo"), "Osvaldo Fresedo");
    }

    #[test]
    fn test_reorder_surname_first() {
        assert_eq!(reorder_surname_first("Di Sarli, Carlos"), "Carlos Di Sarli");
        assert_eq!(reorder_surname_first("De Angelis, Alfredo"), "Alfredo De Angelis");
        assert_eq!(reorder_surname_first("Troilo, Anibal"), "Anibal Troilo");
        assert_eq!(reorder_surname_first("D'Arienzo, Juan"), "Juan D'Arienzo");
        assert_eq!(reorder_surname_first("Smith, John Paul Jr"), "Smith, John Paul Jr");
        assert_eq!(reorder_surname_first("Canaro, Francisco, Maida"), "Canaro, Francisco, Maida");
        assert_eq!(reorder_surname_first("Osvaldo Pugliese"), "Osvaldo Pugliese");
        assert_eq!(reorder_surname_first(""), "");
    }

    #[test]
    fn test_reorder_fixed_pattern_inside_longer_text() {
        assert_eq!(
            reorder_surname_first("Di Sarli, Carlos y su Orquesta"),
            "Carlos Di Sarli y su Orquesta"
        );
    }

    #[test]
    fn test_strip_bracketed() {
        assert_eq!(strip_bracketed("Poema [1935]"), "Poema");
        assert_eq!(strip_bracketed("[EMI] Poema [Remaster] Vol 2"), "Poema Vol 2");
        assert_eq!(strip_bracketed("No brackets"), "No brackets");
        assert_eq!(strip_bracketed(""), "");
    }

    #[test]
    fn test_classify_genre_priority() {
        assert_eq!(classify_genre("Tango"), Style::Tango);
        assert_eq!(classify_genre("vals tango"), Style::Tango);
        assert_eq!(classify_genre("Waltz"), Style::Vals);
        assert_eq!(classify_genre("Milonga Candombe"), Style::Milonga);
        assert_eq!(classify_genre("MARCHA"), Style::Marcha);
        assert_eq!(classify_genre("Foxtrot"), Style::Unknown);
        assert_eq!(classify_genre(""), Style::Unknown);
    }

    #[test]
    fn test_alternative_flag() {
        assert!(is_alternative("Alt Tango"));
        assert!(is_alternative("alternative"));
        assert!(!is_alternative("Waltz"));
        assert!(is_alternative("Alt Waltz"));
        assert!(is_alternative("Alternative Waltz"));
        assert!(!is_alternative("Tango"));
        assert!(!is_alternative(""));
    }

    #[test]
    fn test_genre_flags() {
        let flags = GenreFlags::from_genre("Milonga Candombe");
        assert_eq!(flags.candombe, Flag::Yes);
        assert_eq!(flags.cancion, Flag::No);
        assert_eq!(GenreFlags::from_genre("Tango Canción").cancion, Flag::Yes);
        assert_eq!(GenreFlags::from_genre("Tango Cancion").cancion, Flag::Yes);
        assert_eq!(GenreFlags::from_genre(""), GenreFlags::default());
    }

    #[test]
    fn test_is_tango_genre() {
        assert!(is_tango_genre("Vals"));
        assert!(is_tango_genre("Argentine Tango"));
        assert!(!is_tango_genre("Jazz"));
        assert!(!is_tango_genre(""));
    }

    #[test]
    fn test_path_suffix_key() {
        assert_eq!(
            path_suffix_key("/Volumes/SSD/Mixxx2/Aníbal Troilo/Toda Mi Vida/Pablo.mp3", "mixxx2"),
            Some("anibal troilo/toda mi vida/pablo.mp3".to_string())
        );
        assert_eq!(
            path_suffix_key("C:\\Music\\MIXXX2\\Canaro\\Poema.mp3", "Mixxx2"),
            Some("canaro/poema.mp3".to_string())
        );
        assert_eq!(path_suffix_key("/music/other/Poema.mp3", "Mixxx2"), None);
        assert_eq!(path_suffix_key("/music/Mixxx2", "Mixxx2"), None);
        assert_eq!(path_suffix_key("/music/Mixxx2/a.mp3", ""), None);
    }

    #[test]
    fn test_normalize_filename_keeps_case() {
        assert_eq!(normalize_filename("Poema – Canaro.mp3"), "Poema – Canaro.mp3");
        assert_eq!(normalize_filename("Pabló.MP3"), "Pablo.MP3");
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("01 - Poema (1935).mp3"), "01 Poema 1935.mp3");
        assert_eq!(clean_filename("noext"), "noext");
        assert_eq!(clean_filename(".hidden"), "hidden");
    }
}
