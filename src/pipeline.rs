//! Full matching run: discover, match, assemble, write reports.

use std::time::Instant;
use tracing::{info, warn};

use crate::assemble::assemble_with_progress;
use crate::config::RunConfig;
use crate::error::InputResult;
use crate::json_io::{load_records, save_json};
use crate::matcher::{match_files_with_progress, SongIdMap};
use crate::media::{discover_audio_files, Tagger};
use crate::models::{CatalogRecord, MatchedFile, RunStats, SongCatalog, TangoSong, UnmatchedFile};
use crate::progress::{create_progress_bar, format_duration, log_progress};
use crate::safety::{
    prepare_target_dir, validate_clean_target, validate_distinct_outputs, validate_output_path,
    validate_target_dir,
};

/// Log a progress line every this many files in log-only mode.
const LOG_INTERVAL: u64 = 500;

/// Everything a run produced, as written to disk.
#[derive(Debug, Default)]
pub struct RunReport {
    pub catalog: SongCatalog,
    /// Files that made it into the catalog.
    pub matched: Vec<MatchedFile>,
    pub unmatched: Vec<UnmatchedFile>,
    pub stats: RunStats,
}

fn check_paths(config: &RunConfig) -> InputResult<()> {
    config.validate()?;
    let inputs = config.input_paths();
    let outputs = config.output_paths();
    for output in &outputs {
        validate_output_path(output, &inputs)?;
    }
    validate_distinct_outputs(&outputs)?;
    validate_target_dir(&config.assembly.target_dir, &config.source_dir)?;
    if config.clean_target {
        validate_clean_target(&config.assembly.target_dir, &inputs)?;
    }
    Ok(())
}

/// Run the whole pipeline. Only unreadable inputs and unwritable outputs are
/// errors; per-file problems end up in the unmatched report.
pub fn run(config: &RunConfig, tagger: &dyn Tagger) -> InputResult<RunReport> {
    let start = Instant::now();
    check_paths(config)?;

    let songs: Vec<TangoSong> = load_records(&config.songs_path)?;
    let catalog: Vec<CatalogRecord> = load_records(&config.catalog_path)?;
    let song_ids = SongIdMap::from_songs(&songs);
    info!(
        songs = songs.len(),
        mapped_ids = song_ids.len(),
        records = catalog.len(),
        "Loaded catalogs"
    );
    if song_ids.is_empty() {
        warn!("No song carries a djId, every file will be unmatched");
    }

    let files = discover_audio_files(&config.source_dir, &config.extensions)?;
    info!(
        files = files.len(),
        source = %config.source_dir.display(),
        "Discovered audio files"
    );
    prepare_target_dir(&config.assembly.target_dir, config.clean_target)?;

    // Phase 1: match files to catalog records
    let total = files.len() as u64;
    let pb = create_progress_bar(total, "Phase 1: Matching files", config.log_only);
    let matching = match_files_with_progress(&files, &catalog, &song_ids, &config.matching, |done| {
        pb.inc(1);
        log_progress("Matching", done as u64, total, LOG_INTERVAL, config.log_only);
    });
    pb.finish_and_clear();
    info!(
        matched = matching.stats.matched,
        unmatched = matching.stats.unmatched(),
        "Phase 1 complete ({:.1}% matched)",
        matching.stats.match_rate()
    );

    // Phase 2: copy, tag and build the catalog
    let total = matching.matched.len() as u64;
    let pb = create_progress_bar(total, "Phase 2: Copying and tagging", config.log_only);
    let assembled =
        assemble_with_progress(&matching.matched, &songs, &config.assembly, tagger, |done| {
            pb.inc(1);
            log_progress("Assembling", done as u64, total, LOG_INTERVAL, config.log_only);
        });
    pb.finish_and_clear();

    let mut report = RunReport {
        catalog: SongCatalog {
            songs: assembled.songs,
        },
        matched: assembled.placed,
        unmatched: matching.unmatched,
        stats: RunStats::default(),
    };
    report.unmatched.extend(assembled.reclassified);

    report.stats = RunStats {
        matching: matching.stats,
        assembly: assembled.stats,
        matched: report.matched.len(),
        unmatched: report.unmatched.len(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    // Phase 3: write reports
    save_json(&report.catalog, &config.output_path)?;
    save_json(&report.matched, &config.matched_path)?;
    save_json(&report.unmatched, &config.unmatched_path)?;
    if let Some(stats_path) = &config.stats_path {
        save_json(&report.stats, stats_path)?;
    }

    info!(
        matched = report.stats.matched,
        unmatched = report.stats.unmatched,
        copied = report.stats.assembly.copied,
        tag_failures = report.stats.assembly.tag_failures,
        "Run finished in {}",
        format_duration(start.elapsed())
    );
    Ok(report)
}
