use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;

use tango_catalog::config::{
    parse_extensions, AssembleConfig, JoinKey, MatchConfig, RunConfig, DEFAULT_AUDIO_BASE_URL,
};
use tango_catalog::media::LoftyTagger;
use tango_catalog::pipeline;
use tango_catalog::progress::init_logging;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum JoinKeyArg {
    /// File name only
    Filename,
    /// Path below the --pivot directory
    PathSuffix,
}

#[derive(Parser)]
#[command(name = "tango-match")]
#[command(about = "Match DJ library audio files to the tango catalog, copy and tag them")]
struct Args {
    /// Directory scanned for audio files
    source: PathBuf,

    /// Directory receiving {songID}.{ext} copies
    target: PathBuf,

    /// Normalized catalog produced by clean-library
    #[arg(long, default_value = "djTangoSongs.json")]
    songs: PathBuf,

    /// Catalog records with filename, filesize and location
    #[arg(long, default_value = "djTrack_locations.json")]
    catalog: PathBuf,

    #[arg(long, default_value = "djSongs.json")]
    output: PathBuf,

    #[arg(long, default_value = "djMatchedSongs.json")]
    matched: PathBuf,

    #[arg(long, default_value = "jsUnMatchedSongs.json")]
    unmatched: PathBuf,

    /// Write combined run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Comma-separated audio extensions
    #[arg(long, default_value = "mp3")]
    extensions: String,

    #[arg(long, value_enum, default_value = "filename")]
    join_key: JoinKeyArg,

    /// Directory name the path-suffix key starts after (case-insensitive)
    #[arg(long)]
    pivot: Option<String>,

    /// Do not report near-miss keys for unmatched files
    #[arg(long)]
    no_suggest: bool,

    /// Copy without writing tags
    #[arg(long)]
    no_tags: bool,

    #[arg(long, default_value = DEFAULT_AUDIO_BASE_URL)]
    audio_base_url: String,

    /// Empty the target directory before copying
    #[arg(long)]
    clean_target: bool,

    /// Hide progress bars, log progress lines instead (tail-friendly)
    #[arg(long)]
    log_only: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> RunConfig {
        let join_key = match self.join_key {
            JoinKeyArg::Filename => JoinKey::Filename,
            JoinKeyArg::PathSuffix => JoinKey::PathSuffix {
                pivot: self.pivot.unwrap_or_default(),
            },
        };
        RunConfig {
            songs_path: self.songs,
            catalog_path: self.catalog,
            source_dir: self.source,
            extensions: parse_extensions(&self.extensions),
            output_path: self.output,
            matched_path: self.matched,
            unmatched_path: self.unmatched,
            stats_path: self.stats,
            matching: MatchConfig {
                join_key,
                suggest: !self.no_suggest,
            },
            assembly: AssembleConfig {
                target_dir: self.target,
                audio_base_url: self.audio_base_url,
                write_tags: !self.no_tags,
            },
            clean_target: self.clean_target,
            log_only: self.log_only,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let start = Instant::now();
    let config = args.into_config();

    println!("Source: {:?}", config.source_dir);
    println!("Target: {:?}", config.assembly.target_dir);

    let report = pipeline::run(&config, &LoftyTagger).context("Matching run failed")?;
    let stats = &report.stats;

    println!("\n{:=<60}", "");
    println!("Matching complete!");
    println!("  Files:      {}", stats.matching.files);
    println!(
        "  Matched:    {} ({:.1}%)",
        stats.matched,
        stats.matching.match_rate()
    );
    println!("  Unmatched:  {}", stats.unmatched);
    println!("    no key match:   {}", stats.matching.no_key_match);
    println!("    no size match:  {}", stats.matching.no_size_match);
    println!("    no songID:      {}", stats.matching.no_song_id_mapping);
    println!("    already taken:  {}", stats.matching.already_matched);
    println!("    no metadata:    {}", stats.assembly.no_metadata);
    println!("    copy failed:    {}", stats.assembly.copy_failures);
    println!("  Copied:     {}", stats.assembly.copied);
    println!(
        "  Tagged:     {} ({} failed)",
        stats.assembly.tagged, stats.assembly.tag_failures
    );
    println!("  Catalog:    {:?}", config.output_path);
    println!("  Elapsed:    {:.2}s", start.elapsed().as_secs_f64());
    println!("{:=<60}", "");

    Ok(())
}
