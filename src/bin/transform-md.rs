//! CLI binary for transform-md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `TransformConfig` and prints the paths written.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use transform_md::{
    transform_dir, transform_file, RunReport, Transform, TransformConfig, TransformSet,
};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean up a file in place
  transform-md chat.md

  # Write to a different file
  transform-md chat.md -o clean.md

  # Whole directory (non-recursive, *.md only)
  transform-md --indir exports/ --outdir cleaned/

  # Keep long blank runs
  transform-md chat.md --skip-transforms collapse_blanks

  # Only fence the snippets, nothing else
  transform-md chat.md --run-transforms code_snippet

  # Download "Image of" pictures into images/ next to the output
  transform-md chat.md -o out/chat.md --download-images

ENVIRONMENT VARIABLES:
  TRANSFORM_MD_DOWNLOAD_IMAGES   Same as --download-images
  TRANSFORM_MD_DOWNLOAD_TIMEOUT  Same as --download-timeout
  RUST_LOG                       Override the log filter (e.g. debug)
"#;

/// Clean up exported chat Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "transform-md",
    version,
    about = "Clean up exported chat Markdown: fence code snippets, close fences, collapse blank lines",
    long_about = "Rewrite exported chat Markdown into cleaner Markdown. 'Code snippet' lines \
become fenced code blocks, unterminated fences are closed, long runs of blank lines collapse \
to two, and remote 'Image of' pictures can optionally be downloaded and linked locally.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to transform. Overwritten unless --output is given.
    #[arg(required_unless_present_any = ["indir", "list_transforms"])]
    input: Option<PathBuf>,

    /// Write the result here instead of overwriting the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Transform every *.md file in this directory (requires --outdir).
    #[arg(long, requires = "outdir")]
    indir: Option<PathBuf>,

    /// Output directory for --indir; files keep their names.
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// List available transforms and exit.
    #[arg(long)]
    list_transforms: bool,

    /// Comma-separated transforms to run (replaces the defaults).
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(Transform))]
    run_transforms: Vec<Transform>,

    /// Comma-separated transforms to skip from the defaults.
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(Transform))]
    skip_transforms: Vec<Transform>,

    /// Download remote images referenced as 'Image of' and link local copies.
    #[arg(long, env = "TRANSFORM_MD_DOWNLOAD_IMAGES")]
    download_images: bool,

    /// Per-image HTTP timeout in seconds.
    #[arg(long, env = "TRANSFORM_MD_DOWNLOAD_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    download_timeout: u64,

    /// Print a JSON report instead of the written paths.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_transforms {
        println!("Available transforms:");
        for t in Transform::ALL {
            println!("- {}: {}", t.id(), t.description());
        }
        return Ok(());
    }

    let config = build_config(&cli)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = if let Some(ref indir) = cli.indir {
        let outdir = cli
            .outdir
            .as_ref()
            .context("--outdir is required when --indir is used")?;
        if cli.output.is_some() {
            warn!("--output is ignored when --indir is used");
        }
        transform_dir(indir, outdir, &config)
            .await
            .with_context(|| format!("Failed to transform directory {}", indir.display()))?
    } else {
        let input = cli
            .input
            .as_ref()
            .context("an input file is required unless --indir is used")?;
        let file = transform_file(input, cli.output.as_deref(), &config)
            .await
            .with_context(|| format!("Failed to transform {}", input.display()))?;
        RunReport { files: vec![file] }
    };

    print_report(&cli, &report)
}

/// Map CLI args to `TransformConfig`.
fn build_config(cli: &Cli) -> Result<TransformConfig> {
    let transforms = if !cli.run_transforms.is_empty() {
        if !cli.skip_transforms.is_empty() {
            warn!("--skip-transforms is ignored when --run-transforms is given");
        }
        TransformSet::only(cli.run_transforms.iter().copied())
    } else {
        TransformSet::without(cli.skip_transforms.iter().copied())
    };

    TransformConfig::builder()
        .transforms(transforms)
        .download_images(cli.download_images)
        .download_timeout_secs(cli.download_timeout)
        .build()
        .context("Invalid configuration")
}

fn print_report(cli: &Cli, report: &RunReport) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    if cli.indir.is_some() {
        println!("Wrote:");
        for path in report.written() {
            println!("{}", path.display());
        }
    } else if let Some(path) = report.written().next() {
        println!("Wrote: {}", path.display());
    }
    Ok(())
}
