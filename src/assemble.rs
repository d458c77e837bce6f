//! Catalog assembler: matched files to the final song catalog.
//!
//! For each match the normalized song is looked up by songID, the file is
//! copied to `{target}/{songID}.{ext}` and, once the copy exists, tagged.
//! A missing song or a failed copy turns the match back into an unmatched
//! entry. A failed tag write only counts; the copy stays.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::AssembleConfig;
use crate::media::{copy_file, TagFields, Tagger};
use crate::models::{
    extension_of, AssembleStats, MatchedFile, OutputSong, TangoSong, UnmatchReason, UnmatchedFile,
};

/// Final catalog entry for a song whose audio is served at `audio_url`.
pub fn output_song(song: &TangoSong, audio_url: String) -> OutputSong {
    OutputSong {
        song_id: song.song_id.clone(),
        title: song.song_title_clean_l1.clone(),
        orchestra: song.artist_clean_l2.clone(),
        album: song.album_title_clean_l2.clone(),
        artist_master: song.artist_master.clone(),
        audio_url,
        composer: song.composer_clean_l1.clone(),
        year: song.year,
        style: song.style1,
        alternative: song.alternative,
        candombe: song.candombe,
        cancion: song.cancion,
        singer: String::new(),
    }
}

/// Tags written into the copy; the comment carries the songID.
pub fn tag_fields(song: &TangoSong) -> TagFields {
    TagFields {
        title: song.song_title_clean_l1.clone(),
        album: song.album_title_clean_l2.clone(),
        artist: song.artist_clean_l2.clone(),
        genre: song.genre.clone(),
        comment: song.song_id.clone(),
    }
}

#[derive(Debug, Default)]
pub struct AssembleOutcome {
    pub songs: Vec<OutputSong>,
    /// Matches that were placed into the catalog, in input order.
    pub placed: Vec<MatchedFile>,
    /// Matches turned back into diagnostics (`NoMetadata`, `CopyFailed`).
    pub reclassified: Vec<UnmatchedFile>,
    pub stats: AssembleStats,
}

pub struct Assembler<'a> {
    songs: FxHashMap<&'a str, &'a TangoSong>,
    config: &'a AssembleConfig,
    tagger: &'a dyn Tagger,
    stats: AssembleStats,
}

impl<'a> Assembler<'a> {
    /// The first song wins when two share a songID.
    pub fn new(catalog: &'a [TangoSong], config: &'a AssembleConfig, tagger: &'a dyn Tagger) -> Self {
        let mut songs = FxHashMap::default();
        for song in catalog {
            songs.entry(song.song_id.as_str()).or_insert(song);
        }
        Self {
            songs,
            config,
            tagger,
            stats: AssembleStats::default(),
        }
    }

    pub fn into_stats(self) -> AssembleStats {
        self.stats
    }

    /// Copy, tag and describe one matched file.
    pub fn place(&mut self, matched: &MatchedFile) -> Result<OutputSong, UnmatchedFile> {
        let Some(song) = self.songs.get(matched.song_id.as_str()).copied() else {
            self.stats.no_metadata += 1;
            debug!(song_id = %matched.song_id, "No metadata for matched file");
            return Err(UnmatchedFile::from_match(matched, UnmatchReason::NoMetadata));
        };

        let extension = extension_of(&matched.filepath);
        let destination = self
            .config
            .target_dir
            .join(format!("{}.{}", matched.song_id, extension));

        if let Err(e) = copy_file(&matched.filepath, &destination) {
            self.stats.copy_failures += 1;
            warn!(
                src = %matched.filepath.display(),
                dst = %destination.display(),
                error = %e,
                "Copy failed"
            );
            return Err(
                UnmatchedFile::from_match(matched, UnmatchReason::CopyFailed).with_detail(e.to_string())
            );
        }
        self.stats.copied += 1;

        if self.config.write_tags {
            match self.tagger.write_tags(&destination, &tag_fields(song)) {
                Ok(()) => self.stats.tagged += 1,
                Err(e) => {
                    self.stats.tag_failures += 1;
                    warn!(error = %e, "Tag write failed, keeping untagged copy");
                }
            }
        }

        self.stats.songs += 1;
        Ok(output_song(
            song,
            self.config.audio_url(&matched.song_id, &extension),
        ))
    }
}

/// Place every match in order.
pub fn assemble(
    matches: &[MatchedFile],
    catalog: &[TangoSong],
    config: &AssembleConfig,
    tagger: &dyn Tagger,
) -> AssembleOutcome {
    assemble_with_progress(matches, catalog, config, tagger, |_| {})
}

/// [`assemble`], calling `on_match` with the count done after each match.
pub fn assemble_with_progress(
    matches: &[MatchedFile],
    catalog: &[TangoSong],
    config: &AssembleConfig,
    tagger: &dyn Tagger,
    mut on_match: impl FnMut(usize),
) -> AssembleOutcome {
    let mut assembler = Assembler::new(catalog, config, tagger);
    let mut outcome = AssembleOutcome::default();
    for (i, matched) in matches.iter().enumerate() {
        match assembler.place(matched) {
            Ok(song) => {
                outcome.songs.push(song);
                outcome.placed.push(matched.clone());
            }
            Err(entry) => outcome.reclassified.push(entry),
        }
        on_match(i + 1);
    }
    outcome.stats = assembler.into_stats();
    outcome
}
