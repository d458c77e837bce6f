//! Dump the embedded tags of every audio file under a directory.
//!
//! Usage: extract-tags <music-dir> [output.json]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

use tango_catalog::config::parse_extensions;
use tango_catalog::json_io::save_json;
use tango_catalog::media::{list_files, LoftyTagger, Tagger};
use tango_catalog::models::TagDump;
use tango_catalog::normalize::clean_filename;
use tango_catalog::progress::{create_progress_bar, init_logging, log_progress};

#[derive(Parser)]
#[command(name = "extract-tags")]
#[command(about = "Dump embedded audio tags to JSON")]
struct Args {
    source: PathBuf,

    #[arg(default_value = "djMetaData.json")]
    output: PathBuf,

    /// Comma-separated audio extensions
    #[arg(long, default_value = "mp3")]
    extensions: String,

    #[arg(long)]
    log_only: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let start = Instant::now();

    let extensions = parse_extensions(&args.extensions);
    let files = list_files(&args.source, &extensions).context("Failed to scan source directory")?;

    let tagger = LoftyTagger;
    let mut dumps = Vec::with_capacity(files.len());
    let mut failures = 0usize;

    let total = files.len() as u64;
    let pb = create_progress_bar(total, "Reading tags", args.log_only);
    for (i, path) in files.iter().enumerate() {
        match tagger.extract_tags(path) {
            Ok(attributes) => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(file = %filename, tags = attributes.len(), "Read tags");
                dumps.push(TagDump {
                    filename_clean_l1: clean_filename(&filename),
                    filename,
                    attributes,
                });
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, "Skipping file");
            }
        }
        pb.inc(1);
        log_progress("Reading tags", i as u64 + 1, total, 500, args.log_only);
    }
    pb.finish_and_clear();

    save_json(&dumps, &args.output)?;

    println!("\n{:=<60}", "");
    println!("Tag extraction complete!");
    println!("  Files:    {}", files.len());
    println!("  Dumped:   {}", dumps.len());
    println!("  Skipped:  {}", failures);
    println!("  Elapsed: {:.2}s", start.elapsed().as_secs_f64());
    println!("{:=<60}", "");

    Ok(())
}
