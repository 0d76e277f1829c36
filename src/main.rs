//! # sdc-mender CLI (`sdcm`)
//!
//! ## Usage
//!
//! ```bash
//! sdcm [--config ./sdcm.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sdcm check` | Report what would be fixed; never writes |
//! | `sdcm fix` | Fix component definitions and heading calls in place |
//!
//! ## Examples
//!
//! ```bash
//! # Preview everything under a theme's components directory
//! sdcm check --root web/themes/custom/site/components
//!
//! # Only migrate heading includes, with JSON progress for CI logs
//! sdcm fix --pass templates --progress json --config ./sdcm.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sdc_mender::config::{self, Config};
use sdc_mender::progress::ProgressMode;
use sdc_mender::run::{self, Pass, RunOptions};

/// sdc-mender: batch repair of component definitions and heading includes.
#[derive(Parser)]
#[command(
    name = "sdcm",
    about = "sdc-mender: batch repair of component definitions and heading includes",
    version,
    long_about = "Scans a tree of *.component.yml files and Twig templates, fixes known-bad \
    shapes (empty properties, array-shaped variants, property/slot name clashes, legacy \
    heading includes) with minimal in-place edits, and keeps a backup of every changed file."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional. Without it, defaults apply and `--root` is required.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Report findings without writing anything.
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Fix findings in place, writing a backup of every changed file.
    Fix {
        #[command(flatten)]
        target: Target,

        /// Dry run: report what would change without writing files or backups.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args)]
struct Target {
    /// Directory to scan. Overrides `scan.root` from the config file.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Which files to process.
    #[arg(long, value_enum, default_value_t = Pass::All)]
    pass: Pass,

    /// Per-file progress on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sdc_mender={}", level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (name, target, write) = match cli.command {
        Commands::Check { target } => ("check", target, false),
        Commands::Fix { target, dry_run } => ("fix", target, !dry_run),
    };

    let cfg = match &cli.config {
        Some(path) => {
            let mut cfg = config::load_config(path)?;
            if target.root.is_some() {
                cfg.scan.root = target.root.clone();
            }
            cfg
        }
        None => {
            let cfg = Config::minimal(target.root.clone());
            config::validate(&cfg)?;
            cfg
        }
    };

    let progress = target.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let options = RunOptions {
        pass: target.pass,
        write,
    };
    let summary = run::run(&cfg, &options, progress.reporter().as_ref())?;
    summary.print(name);

    Ok(())
}
