use anyhow::{Context, Result};
use artwork_embed::catalog::SpotifyCatalog;
use artwork_embed::config::Config;
use artwork_embed::fetch::{build_agent, HttpImageFetcher, ScratchImage};
use artwork_embed::media::FfmpegTool;
use artwork_embed::pipeline::{FileOutcome, Pipeline};
use artwork_embed::progress::{format_duration, set_log_only};
use artwork_embed::tags::LoftyTagReader;
use artwork_embed::walk::{process_directory, WalkSummary};
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "artwork-embed")]
#[command(about = "Find cover art for audio files and embed it in place")]
struct Args {
    /// Audio file or directory to process recursively
    path: PathBuf,

    /// Replace artwork that is already embedded
    #[arg(short, long)]
    force: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars, log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

fn print_summary(root: &Path, summary: &WalkSummary, elapsed: Duration) {
    println!("\n{:=<60}", "");
    println!("Artwork embedding complete: {}", root.display());
    println!("  Files:    {}", summary.total());
    println!("  Embedded: {} ({} replaced)", summary.embedded, summary.replaced);
    println!(
        "  Skipped:  {} (artwork present {}, no title {}, no match {})",
        summary.skipped(),
        summary.skipped_present,
        summary.skipped_no_title,
        summary.skipped_no_match
    );
    println!("  Failed:   {}", summary.failed.len());
    for path in &summary.failed {
        println!("    {}", path.display());
    }
    println!("  Elapsed:  {}", format_duration(elapsed));
    println!("{:=<60}", "");
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            // Help goes to stdout and is a success; everything else is a usage error
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    init_logging(args.verbose);
    set_log_only(args.log_only);

    let config = Config::load(args.force)?;

    let tool = FfmpegTool::default();
    tool.ensure_available()
        .context("ffprobe and ffmpeg must be installed and on PATH")?;

    let agent = build_agent(config.http_timeout);
    let catalog = SpotifyCatalog::connect(agent.clone(), config.credentials.clone())
        .context("Failed to authenticate with Spotify")?;

    let metadata = fs::metadata(&args.path)
        .with_context(|| format!("Cannot access {}", args.path.display()))?;

    let mut pipeline = Pipeline::new(
        Box::new(tool),
        Box::new(LoftyTagReader),
        Box::new(catalog),
        Box::new(HttpImageFetcher::new(agent)),
        ScratchImage::for_process(),
        config.force_overwrite,
    );

    let start = Instant::now();
    if metadata.is_dir() {
        let summary = process_directory(&mut pipeline, &args.path)?;
        print_summary(&args.path, &summary, start.elapsed());
    } else {
        let outcome = pipeline
            .process_file(&args.path)
            .with_context(|| format!("Failed to process {}", args.path.display()))?;
        match outcome {
            FileOutcome::Embedded { replaced } => info!(
                "Done in {}{}",
                format_duration(start.elapsed()),
                if replaced { " (artwork replaced)" } else { "" }
            ),
            FileOutcome::Skipped(reason) => {
                warn!("Skipping {}: {}", args.path.display(), reason)
            }
        }
    }

    Ok(())
}
