use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "camsync", about = "Download camera recordings from blob storage")]
pub struct Cli {
    /// Destination root directory (e.g. an external hard drive mount)
    #[arg(short = 'd', long)]
    pub directory: String,

    /// Path to the device-to-location mapping CSV
    /// (columns: streamname, district, acname, location)
    #[arg(short = 'm', long)]
    pub mapping: String,

    /// Path to a device list CSV (column: streamname).
    /// When omitted, every device in the mapping table is synced.
    #[arg(long)]
    pub devices: Option<String>,

    /// First recording date to download (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start_date: String,

    /// Last recording date to download (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub end_date: String,

    /// Blob service endpoint, e.g. https://account.blob.core.windows.net
    #[arg(long, env = "BLOB_ENDPOINT")]
    pub endpoint: String,

    /// Blob container name
    #[arg(short = 'c', long)]
    pub container: String,

    /// Pre-built SAS query string for the container.
    /// WARNING: passing via --sas-token is visible in process listings.
    /// Prefer the BLOB_SAS_TOKEN environment variable instead.
    #[arg(long, env = "BLOB_SAS_TOKEN")]
    pub sas_token: Option<String>,

    /// Remote namespace prefix the recordings live under
    #[arg(long, default_value = "live-record")]
    pub remote_prefix: String,

    /// Number of devices to sync in parallel
    #[arg(short = 'n', long, default_value_t = 4)]
    pub concurrency: u16,

    /// Write a per-date inventory CSV for each device after syncing
    #[arg(long)]
    pub report: bool,

    /// Path to the ffprobe binary used for inventory durations
    #[arg(long, default_value = "ffprobe")]
    pub ffprobe_path: String,

    /// Do not modify the local filesystem
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
