use clap::{Parser, Subcommand};
use seqport::reconcile::ReconcileTarget;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seqport")]
#[command(author, version, about = "Camera sequence export and status reconciliation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Status database (overrides paths.database)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export flagged sequence files to video containers
    Export {
        /// Channel directories or sequence files (skips store discovery)
        paths: Vec<PathBuf>,

        /// Sequence backup root (defaults to paths.sequence_root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output root (defaults to paths.recordings_root)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Report synthetic success without running the converter
        #[arg(long)]
        simulate: bool,

        /// Convert even when a valid export already exists
        #[arg(long)]
        no_skip_existing: bool,

        /// Keep invalid leftovers from earlier runs
        #[arg(long)]
        no_clean: bool,

        /// Do not fall back to the secondary format
        #[arg(long)]
        no_fallback: bool,

        /// Status value selecting channels to export
        #[arg(long)]
        only_value: Option<i64>,

        /// Destination directories processed concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute status codes from the filesystem and update the store
    Reconcile {
        /// Tree and table to reconcile
        #[arg(long, value_enum, default_value_t = ReconcileTarget::Sequences)]
        target: ReconcileTarget,

        /// Root directory (defaults to the configured root for the target)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Size in MB at or above which a file counts as present
        #[arg(long)]
        threshold_mb: Option<u64>,

        /// Show the staged changes without writing
        #[arg(long)]
        dry_run: bool,

        /// Commit without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Delete matching files smaller than this many MB before scanning
        #[arg(long)]
        delete_small_mb: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record export counts and sizes per case and channel
    Inventory {
        /// Recordings root (defaults to paths.recordings_root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Remove duplicate exports, keeping one file per channel and format
    Dedupe {
        /// Recordings root (defaults to paths.recordings_root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Delete the duplicates instead of listing them
        #[arg(long)]
        apply: bool,
    },

    /// Show the per-channel status distribution
    Summary {
        /// Status table to summarize
        #[arg(long, value_enum, default_value_t = ReconcileTarget::Exports)]
        target: ReconcileTarget,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the converter is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
