//! PDF split command line
//!
//! Splits a local PDF into single-page files, or zips a selection of pages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use pdfsplit_core::{
    archive_file_name, archive_pages_with, document_info, parse_ranges_within, select_pages,
    split_document_with, ArchiveOptions, CancelToken, PipelineConfig, ProgressEvent,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfsplit")]
#[command(version, about = "Split a PDF into single-page PDFs, optionally zipped")]
struct Args {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Directory for page files or the archive
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Pages to keep, e.g. "1-3, 5" (all pages if omitted)
    #[arg(short, long, value_name = "RANGES")]
    pages: Option<String>,

    /// Write one ZIP instead of individual page files
    #[arg(short, long)]
    zip: bool,

    /// Archive file name (generated from the input name if omitted)
    #[arg(long, value_name = "NAME", requires = "zip")]
    archive_name: Option<String>,

    /// Deflate level 0-9, overrides the config file
    #[arg(long, value_name = "LEVEL")]
    level: Option<u8>,

    /// JSON pipeline configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print document info as JSON and exit
    #[arg(long)]
    info: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    for path in run(&args)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PipelineConfig::from_json_str(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(level) = args.level {
        config.archive = ArchiveOptions::with_level(level);
        config.validate()?;
    }
    Ok(config)
}

/// Execute one invocation; returns the paths written
fn run(args: &Args) -> Result<Vec<PathBuf>> {
    let config = load_config(args)?;
    let bytes =
        fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let source_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if args.info {
        let info = document_info(&bytes)?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(Vec::new());
    }

    let cancel = CancelToken::new();
    let mut log_progress = |event: ProgressEvent| {
        tracing::debug!(
            stage = %event.stage,
            percentage = event.percentage,
            "{}",
            event.message
        );
    };

    let pages = split_document_with(
        &bytes,
        &source_name,
        &config.split,
        &cancel,
        &mut log_progress,
    )?;

    let selected = match &args.pages {
        Some(ranges) => {
            let wanted = parse_ranges_within(ranges, pages.len() as u32)?;
            select_pages(&pages, &wanted)
        }
        None => pages,
    };
    if selected.is_empty() {
        bail!("no pages selected");
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    if args.zip {
        let name = args
            .archive_name
            .clone()
            .unwrap_or_else(|| archive_file_name(&source_name));
        let archive = archive_pages_with(
            &selected,
            Some(name.as_str()),
            &config.archive,
            &cancel,
            &mut log_progress,
        )?;
        let path = write_file(&args.out_dir, &archive.file_name, &archive.bytes)?;
        tracing::info!(members = archive.member_count, "wrote {}", path.display());
        return Ok(vec![path]);
    }

    let mut written = Vec::with_capacity(selected.len());
    for page in &selected {
        written.push(write_file(&args.out_dir, &page.file_name, &page.bytes)?);
    }
    tracing::info!(pages = written.len(), "wrote pages to {}", args.out_dir.display());
    Ok(written)
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
