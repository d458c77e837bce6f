//! Merge a raw artist list into a registry with one entry per name.
//!
//! Usage: consolidate-artists <raw.json> [ArtistMaster.json]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use tango_catalog::artists::{consolidate_artists, duplicate_names};
use tango_catalog::json_io::{load_records, save_json};
use tango_catalog::models::ArtistMaster;
use tango_catalog::progress::init_logging;
use tango_catalog::safety::validate_output_path;

#[derive(Parser)]
#[command(name = "consolidate-artists")]
#[command(about = "Merge duplicate artist registry entries")]
struct Args {
    /// Raw registry, possibly with repeated names
    input: PathBuf,

    #[arg(default_value = "ArtistMaster.json")]
    output: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    validate_output_path(&args.output, &[args.input.as_path()])?;

    let raw: Vec<ArtistMaster> =
        load_records(&args.input).context("Failed to load raw artist list")?;
    let merged = consolidate_artists(&raw);

    // Same name in different case or accents survives consolidation
    for name in duplicate_names(&merged) {
        tracing::warn!(artist = %name, "Near-duplicate artist name kept");
    }

    save_json(&merged, &args.output)?;

    println!("Artists: {} raw -> {} consolidated", raw.len(), merged.len());
    println!(
        "Active:  {}",
        merged.iter().filter(|a| a.is_active()).count()
    );
    Ok(())
}
