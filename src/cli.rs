// SPDX-License-Identifier: MPL-2.0

use crate::config::DEFAULT_OUTPUT_DIR;
use clap::Parser;
use std::path::PathBuf;

/// Back up one direct message thread: text goes to a CSV record, images and
/// videos are downloaded next to it, and your own messages can be removed
/// from the thread afterwards.
#[derive(Parser, Debug)]
#[command(name = "dmvault", version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Account username.
    #[arg(short, long)]
    pub username: String,

    /// Account password.
    #[arg(short, long, env = "DMVAULT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Title of the direct thread to back up (first exact match wins).
    #[arg(short = 't', long)]
    pub thread_title: String,

    /// Log progress and errors (to stderr, or to --log-file).
    #[arg(short, long)]
    pub debug: bool,

    /// Remove the messages you sent from the thread after the backup.
    #[arg(short, long)]
    pub remove: bool,

    /// With --remove, delete newest messages first.
    #[arg(long, requires = "remove")]
    pub reverse: bool,

    /// Output directory for the record file and media (created if absent).
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Write log lines to this file instead of stderr.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Base URL of the messaging API (overrides settings).
    #[arg(long)]
    pub service_url: Option<String>,

    /// Log and skip media that fails to download instead of stopping.
    #[arg(long)]
    pub skip_failed_media: bool,
}
