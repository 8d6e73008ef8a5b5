use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelfeed")]
#[command(author, version, about = "Short-video feed playback engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one feed page and list its videos with resolved sources
    Feed {
        /// Page number (0-based)
        #[arg(long, default_value = "0")]
        page: u32,

        /// Free-text caption search
        #[arg(short, long)]
        query: Option<String>,

        /// Tag filter (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the source candidates and poster for a video record file
    Resolve {
        /// JSON file holding one video record
        #[arg(required = true)]
        file: PathBuf,

        /// Resolve as a manual retry would
        #[arg(long)]
        fallback: bool,
    },

    /// Play through the live feed headlessly and report per-video results
    Check {
        /// Number of videos to check
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,

        /// Free-text caption search
        #[arg(short, long)]
        query: Option<String>,

        /// Tag filter (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Give up after this many seconds
        #[arg(long, default_value = "120")]
        timeout: u64,

        /// Send view events to the backend
        #[arg(long)]
        record_views: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the device identity, creating it if needed
    Device {
        /// Mark the entry gate as passed
        #[arg(long)]
        enter: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
