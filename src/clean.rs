//! Library cleaning: catalog export rows into normalized [`TangoSong`]s.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::artists::{seed_registry, ArtistRegistry};
use crate::config::CleanConfig;
use crate::models::{ArtistMaster, CatalogRecord, NotFoundArtist, TangoSong};
use crate::normalize::{
    apply_known_names, classify_genre, clean_text, is_tango_genre, reorder_surname_first,
    strip_bracketed, GenreFlags,
};

/// Result of one cleaning pass.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub songs: Vec<TangoSong>,
    /// Distinct original artist texts with no registry match, sorted.
    pub not_found_artists: Vec<NotFoundArtist>,
    /// Distinct `artistCleanL2` values, for bootstrapping a registry.
    pub seed: Vec<ArtistMaster>,
    /// Records dropped by the genre allow-list.
    pub skipped: usize,
    /// songIDs derived by more than one record.
    pub duplicate_ids: usize,
}

fn clean_level1(s: &str) -> String {
    apply_known_names(&clean_text(s))
}

/// Normalize one record. Genre filtering is the caller's concern.
pub fn clean_record(
    record: &CatalogRecord,
    registry: &ArtistRegistry,
    config: &CleanConfig,
) -> TangoSong {
    let song_title_clean_l1 = clean_level1(&record.title);
    let album_title_clean_l1 = clean_level1(&record.album);
    let album_title_clean_l2 = strip_bracketed(&album_title_clean_l1);
    let artist_clean_l1 = clean_level1(&record.artist);
    let artist_clean_l2 = reorder_surname_first(&artist_clean_l1);
    let artist_master = registry
        .resolve(&artist_clean_l2)
        .map(str::to_string)
        .unwrap_or_default();
    let flags = GenreFlags::from_genre(&record.genre);

    TangoSong {
        song_id: config.id_strategy.generate(&record.album, &record.title),
        dj_id: record.id.clone(),
        song_title_original: record.title.clone(),
        song_title_clean_l1,
        album_title_original: record.album.clone(),
        album_title_clean_l1,
        album_title_clean_l2,
        artist_original: record.artist.clone(),
        artist_clean_l1,
        artist_clean_l2,
        artist2_original: record.album_artist.clone(),
        artist2_clean_l1: clean_level1(&record.album_artist),
        composer_original: record.composer.clone(),
        composer_clean_l1: clean_level1(&record.composer),
        year: record.year,
        duration: record.duration.map(|d| d.round() as i64),
        bpm: record.bpm.map(|b| b.round() as i64),
        genre: record.genre.clone(),
        artist_master,
        style1: classify_genre(&record.genre),
        alternative: flags.alternative,
        candombe: flags.candombe,
        cancion: flags.cancion,
    }
}

/// Clean a whole export, keeping only tango-family genres.
pub fn clean_library(
    records: &[CatalogRecord],
    registry: &ArtistRegistry,
    config: &CleanConfig,
) -> CleanOutcome {
    let mut outcome = CleanOutcome::default();
    let mut not_found: BTreeSet<String> = BTreeSet::new();
    let mut seen_ids: FxHashMap<String, String> = FxHashMap::default();

    for record in records {
        if !is_tango_genre(&record.genre) {
            debug!(id = %record.id, genre = %record.genre, "Skipping non-tango genre");
            outcome.skipped += 1;
            continue;
        }

        let song = clean_record(record, registry, config);

        if song.artist_master.is_empty() && !record.artist.trim().is_empty() {
            not_found.insert(record.artist.clone());
        }

        if let Some(previous) = seen_ids.insert(song.song_id.clone(), song.dj_id.clone()) {
            warn!(
                song_id = %song.song_id,
                first = %previous,
                second = %song.dj_id,
                "Two records share album and title"
            );
            outcome.duplicate_ids += 1;
        }

        outcome.songs.push(song);
    }

    outcome.seed = seed_registry(outcome.songs.iter().map(|s| s.artist_clean_l2.as_str()));
    outcome.not_found_artists = not_found
        .into_iter()
        .map(|artist| NotFoundArtist { artist })
        .collect();

    info!(
        songs = outcome.songs.len(),
        skipped = outcome.skipped,
        not_found_artists = outcome.not_found_artists.len(),
        "Library cleaned"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Flag, Style};
    use crate::song_id::IdStrategy;

    fn record(id: &str, title: &str, album: &str, artist: &str, genre: &str) -> CatalogRecord {
        CatalogRecord {
            id: id.into(),
            title: title.into(),
            album: album.into(),
            artist: artist.into(),
            genre: genre.into(),
            ..Default::default()
        }
    }

    fn registry() -> ArtistRegistry {
        ArtistRegistry::new(&[
            ArtistMaster::new("Carlos Di Sarli"),
            ArtistMaster::new("Osvaldo Pugliese"),
        ])
    }

    #[test]
    fn test_clean_record_levels() {
        let mut rec = record(
            "17",
            "Bahía Blanca",
            "Bahía Blanca [Remastered]",
            "Di Sarli, Carlos",
            "Tango",
        );
        rec.duration = Some(172.6);
        rec.composer = "  Carlos Di Sarli".into();
        let song = clean_record(&rec, &registry(), &CleanConfig::default());

        assert_eq!(song.dj_id, "17");
        assert_eq!(song.song_title_original, "Bahía Blanca");
        assert_eq!(song.song_title_clean_l1, "Bahia Blanca");
        assert_eq!(song.album_title_clean_l1, "Bahia Blanca [Remastered]");
        assert_eq!(song.album_title_clean_l2, "Bahia Blanca");
        assert_eq!(song.artist_clean_l2, "Carlos Di Sarli");
        assert_eq!(song.artist_master, "Carlos Di Sarli");
        assert_eq!(song.composer_clean_l1, "Carlos Di Sarli");
        assert_eq!(song.duration, Some(173));
        assert_eq!(song.style1, Style::Tango);
        assert_eq!(song.song_id.len(), 32);
    }

    #[test]
    fn test_clean_record_known_name_fix() {
        let rec = record("1", "La Yumba", "", "Osvalo Pugliese", "Tango");
        let song = clean_record(&rec, &registry(), &CleanConfig::default());
        assert_eq!(song.artist_clean_l1, "Osvaldo Pugliese");
        assert_eq!(song.artist_master, "Osvaldo Pugliese");
    }

    #[test]
    fn test_clean_library_filters_genres() {
        let records = vec![
            record("1", "Poema", "Poema", "Francisco Canaro", "Tango"),
            record("2", "Some Jazz", "", "Someone", "Jazz"),
            record("3", "Corazon de Oro", "", "Francisco Canaro", "Vals, Alt."),
            record("4", "Untitled", "", "", ""),
        ];
        let outcome = clean_library(&records, &registry(), &CleanConfig::default());
        assert_eq!(outcome.songs.len(), 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.songs[1].style1, Style::Vals);
        assert_eq!(outcome.songs[1].alternative, Flag::Yes);
        assert_eq!(
            outcome.not_found_artists,
            vec![NotFoundArtist {
                artist: "Francisco Canaro".into()
            }]
        );
        assert_eq!(outcome.seed.len(), 1);
        assert_eq!(outcome.seed[0].artist, "Francisco Canaro");
    }

    #[test]
    fn test_clean_library_content_hash_reproducible() {
        let records = vec![
            record("1", "Poema", "Poema", "Canaro", "Tango"),
            record("2", "Poema", "Poema", "Canaro", "Tango"),
        ];
        let config = CleanConfig {
            id_strategy: IdStrategy::ContentHash,
        };
        let first = clean_library(&records, &registry(), &config);
        let second = clean_library(&records, &registry(), &config);
        assert_eq!(first.songs[0].song_id, second.songs[0].song_id);
        // Kept, but reported
        assert_eq!(first.songs.len(), 2);
        assert_eq!(first.duplicate_ids, 1);
    }
}
