#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `zafra`: converts a sugar mill's daily lab report into indicator JSON.
//!
//! ```text
//! zafra grid <report.json|report.csv> [--page N] [--output FILE]
//! zafra pdf <report.pdf> [--page N] [--output FILE]
//! zafra image <scan>... [--output-dir DIR]
//! zafra split <report.json|report.csv> --out-dir DIR [--page N]
//! zafra sheets <DIR> [--output FILE]
//! zafra layouts
//! ```
//!
//! Every extracting subcommand accepts `--layout <id>` or
//! `--layout-file <path>`. Settings not given on the command line come from
//! `zafra.toml` (or `--config <path>`) and the `ZAFRA_TESSERACT` /
//! `ZAFRA_OCR_LANG` environment variables.
//!
//! Uses `indicatif-log-bridge` (via [`zafra_cli_utils::init_logger`]) so
//! that log lines and the batch progress bar never fight for the terminal.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(name = "zafra", about = "Daily lab report to indicator JSON converter")]
struct Cli {
    /// Run configuration file (defaults to ./zafra.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Layout selection shared by the extracting subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Embedded layout id (see `zafra layouts`)
    #[arg(long)]
    pub layout: Option<String>,
    /// Layout TOML file, instead of an embedded layout
    #[arg(long, conflicts_with = "layout")]
    pub layout_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract from a structural grid (JSON or CSV)
    Grid {
        /// Grid file
        file: PathBuf,
        /// 1-indexed page (multi-page JSON grids only)
        #[arg(long)]
        page: Option<usize>,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Write JSON here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract from the text of a PDF page
    Pdf {
        /// PDF file
        file: PathBuf,
        /// 1-indexed page
        #[arg(long)]
        page: Option<usize>,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Write JSON here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract from scanned report images using OCR
    Image {
        /// Image files (PNG or JPEG)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Write JSON here instead of stdout (single image only)
        #[arg(long, short, conflicts_with = "output_dir")]
        output: Option<PathBuf>,
        /// Write `<image stem>.json` files into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Segment a grid into per-section CSV sheets for validation
    Split {
        /// Grid file
        file: PathBuf,
        /// 1-indexed page (multi-page JSON grids only)
        #[arg(long)]
        page: Option<usize>,
        /// Directory to write the sheets into
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Convert validated section sheets to JSON
    Sheets {
        /// Directory holding the section sheets
        dir: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Write JSON here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List embedded layouts
    Layouts,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = zafra_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = RunConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Grid {
            file,
            page,
            layout,
            output,
        } => {
            let layout = commands::resolve_layout(&layout, &config)?;
            let groups = commands::grid(&file, page, &layout, &config)?;
            commands::write_output(&groups, output.as_deref())?;
        }
        Commands::Pdf {
            file,
            page,
            layout,
            output,
        } => {
            let layout = commands::resolve_layout(&layout, &config)?;
            let groups = commands::pdf(&file, page, &layout, &config)?;
            commands::write_output(&groups, output.as_deref())?;
        }
        Commands::Image {
            files,
            layout,
            output,
            output_dir,
        } => {
            let layout = commands::resolve_layout(&layout, &config)?;
            let failed = commands::images(
                &files,
                &layout,
                &config,
                output.as_deref(),
                output_dir.as_deref(),
                &multi,
            )?;
            if failed > 0 {
                return Err(format!("{failed} of {} images failed", files.len()).into());
            }
        }
        Commands::Split {
            file,
            page,
            out_dir,
            layout,
        } => {
            let layout = commands::resolve_layout(&layout, &config)?;
            for path in commands::split(&file, page, &out_dir, &layout, &config)? {
                println!("{}", path.display());
            }
        }
        Commands::Sheets {
            dir,
            layout,
            output,
        } => {
            let layout = commands::resolve_layout(&layout, &config)?;
            let groups = commands::sheets(&dir, &layout)?;
            commands::write_output(&groups, output.as_deref())?;
        }
        Commands::Layouts => {
            println!("{:<24} {:<8} NAME", "ID", "VERSION");
            for layout in zafra_layout::all_layouts() {
                println!("{:<24} {:<8} {}", layout.id, layout.version, layout.name);
            }
        }
    }

    Ok(())
}
