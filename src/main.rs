mod batch;
mod error;
mod page;
mod rows;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use batch::{ChunkOutcome, RunOutcome, Survey};
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "sdb_chunker",
    about = "Combine saved safety deposit box pages into chunked row files"
)]
struct Cli {
    /// Directory holding the saved .html pages (default: current directory)
    input: Option<PathBuf>,
    /// Directory for combined_chunk_<N>.txt files (default: input directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Pages per output file (default: 25)
    #[arg(short = 'n', long)]
    chunk_size: Option<usize>,
    /// Validate the page sequence and print the chunk plan without writing anything
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::from_env()
        .context("Failed to load SDB_* settings")?
        .with_overrides(cli.input, cli.output, cli.chunk_size)?;
    let input_dir = settings.input_dir()?;
    let output_dir = settings.output_dir()?;
    info!(settings_loaded = ?settings, msg = "Starting chunk export");

    let result = if cli.check {
        check(&input_dir, settings.chunk_size)
    } else {
        combine(&input_dir, &output_dir, settings.chunk_size)
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn combine(input_dir: &Path, output_dir: &Path, chunk_size: usize) -> anyhow::Result<()> {
    let outcome = batch::combine_html_files_in_chunks(input_dir, output_dir, chunk_size)
        .with_context(|| format!("Chunk export from {:?} failed", input_dir))?;

    match outcome {
        RunOutcome::Completed(chunks) => {
            for chunk in &chunks {
                print_chunk(chunk);
            }
        }
        aborted => print_abort(&aborted),
    }
    Ok(())
}

fn check(input_dir: &Path, chunk_size: usize) -> anyhow::Result<()> {
    let page_map = match batch::scan_directory(input_dir)? {
        Survey::Abort(outcome) => {
            print_abort(&outcome);
            return Ok(());
        }
        Survey::Ready(page_map) => page_map,
    };

    let chunks = page_map.chunks(chunk_size)?;
    println!(
        "Pages {}-{} complete ({} files), {} chunks planned:",
        page_map.first_page().unwrap_or_default(),
        page_map.last_page().unwrap_or_default(),
        page_map.len(),
        chunks.len()
    );
    for chunk in &chunks {
        println!(
            "  {:<24} pages {}-{}",
            chunk.file_name(),
            chunk.first_page(),
            chunk.last_page()
        );
    }
    Ok(())
}

fn print_abort(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoHtmlFiles => println!("No .html files found in folder."),
        RunOutcome::NoValidFiles => println!("No valid HTML files with page numbers found."),
        RunOutcome::MissingPages(missing) => {
            println!("Missing pages detected. Aborting chunk export.");
            println!("Missing pages: {:?}", missing);
        }
        RunOutcome::Completed(_) => {}
    }
}

fn print_chunk(chunk: &ChunkOutcome) {
    match chunk {
        ChunkOutcome::Written {
            first_page,
            last_page,
            file_name,
            ..
        } => println!("Pages {}-{} saved as {}", first_page, last_page, file_name),
        ChunkOutcome::Empty {
            index,
            first_page,
            last_page,
        } => println!(
            "Chunk {} (Pages {}-{}) had no valid content. Skipped.",
            index, first_page, last_page
        ),
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
