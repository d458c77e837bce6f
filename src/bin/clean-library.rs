//! Clean a DJ library export into the normalized tango catalog.
//!
//! Keeps tango-family genres only, writes the normalized songs, the original
//! artist names missing from the registry, and optionally a registry seed.
//!
//! Usage: clean-library [djLibrary.json|library.csv] --artists ArtistMaster.json

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use tango_catalog::artists::{duplicate_names, ArtistRegistry};
use tango_catalog::clean::clean_library;
use tango_catalog::config::CleanConfig;
use tango_catalog::json_io::{load_records, save_json};
use tango_catalog::models::{ArtistMaster, CatalogRecord};
use tango_catalog::progress::{create_spinner, init_logging};
use tango_catalog::safety::validate_output_path;
use tango_catalog::song_id::IdStrategy;

#[derive(Parser)]
#[command(name = "clean-library")]
#[command(about = "Normalize a DJ library export into tango songs")]
struct Args {
    /// Library export: JSON records, or CSV with a header row
    #[arg(default_value = "djLibrary.json")]
    library: PathBuf,

    /// Canonical artist registry
    #[arg(long, default_value = "ArtistMaster.json")]
    artists: PathBuf,

    #[arg(long, default_value = "djTangoSongs.json")]
    output: PathBuf,

    /// Original artist names with no registry entry
    #[arg(long, default_value = "djNotFoundArtistMasters.json")]
    not_found: PathBuf,

    /// Also write distinct cleaned artist names as a registry seed
    #[arg(long)]
    artist_seed: Option<PathBuf>,

    /// Random songIDs instead of album/title hashes (ids change every run)
    #[arg(long)]
    random_ids: bool,

    #[arg(long)]
    log_only: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let start = Instant::now();

    let inputs = [args.library.as_path(), args.artists.as_path()];
    validate_output_path(&args.output, &inputs)?;
    validate_output_path(&args.not_found, &inputs)?;
    if let Some(seed) = &args.artist_seed {
        validate_output_path(seed, &inputs)?;
    }

    let records: Vec<CatalogRecord> =
        load_records(&args.library).context("Failed to load library export")?;
    let masters: Vec<ArtistMaster> =
        load_records(&args.artists).context("Failed to load artist registry")?;
    for name in duplicate_names(&masters) {
        tracing::warn!(artist = %name, "Registry lists this artist more than once");
    }
    let registry = ArtistRegistry::new(&masters);

    let config = CleanConfig {
        id_strategy: if args.random_ids {
            IdStrategy::Random
        } else {
            IdStrategy::ContentHash
        },
    };

    let spinner = create_spinner("Cleaning library", args.log_only);
    let outcome = clean_library(&records, &registry, &config);
    spinner.finish_and_clear();

    save_json(&outcome.songs, &args.output)?;
    save_json(&outcome.not_found_artists, &args.not_found)?;
    if let Some(seed) = &args.artist_seed {
        save_json(&outcome.seed, seed)?;
    }

    println!("\n{:=<60}", "");
    println!("Cleaning complete!");
    println!("  Records:            {}", records.len());
    println!("  Songs:              {}", outcome.songs.len());
    println!("  Skipped (genre):    {}", outcome.skipped);
    println!("  Duplicate songIDs:  {}", outcome.duplicate_ids);
    println!("  Artists not found:  {}", outcome.not_found_artists.len());
    println!("  Registry entries:   {}", registry.len());
    println!("  Elapsed: {:.2}s", start.elapsed().as_secs_f64());
    println!("{:=<60}", "");

    Ok(())
}
