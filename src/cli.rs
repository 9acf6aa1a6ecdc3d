use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bucket-inspector")]
#[command(about = "Audits buckets for public access and reports what changed since the last scan")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run all checks, store a snapshot and notify about issues
    Scan(ScanArgs),

    /// Display the most recent snapshot or a specific one
    Report(ReportArgs),

    /// Compare two snapshots
    Diff(DiffArgs),
}

/// Where account configs live and where snapshots go.
#[derive(Args, Clone, Default)]
pub struct StoreArgs {
    /// Directory holding <account>.json configs and whitelist.json
    #[arg(long, env = "CONFIG_STORE")]
    pub config_store: Option<PathBuf>,

    /// Snapshot store: a directory, or sqlite:<path>
    #[arg(long, env = "OUTPUT_STORE")]
    pub output: Option<String>,

    /// How far back to look for the previous snapshot (e.g. 200h, 7d)
    #[arg(long)]
    pub horizon: Option<String>,
}

#[derive(Parser)]
pub struct ScanArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Report only issues that are new or fixed since the previous snapshot
    /// (DIFF_ONLY accepts any value but an empty one, 0, false, no, off or n)
    #[arg(long, env = "DIFF_ONLY", value_parser = FalseyValueParser::new(), default_value_t = false)]
    pub diff_only: bool,

    /// Incoming webhook for notifications
    #[arg(long, env = "HOOK_URL")]
    pub hook_url: Option<String>,

    /// Service answering with the caller's public IP
    #[arg(long)]
    pub check_ip_url: Option<String>,

    /// Output as JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ReportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Show a specific snapshot by key
    #[arg(long)]
    pub key: Option<String>,

    /// List snapshot keys within the horizon
    #[arg(long, default_value_t = false)]
    pub list: bool,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Older snapshot key
    #[arg(long)]
    pub from: Option<String>,

    /// Newer snapshot key
    #[arg(long)]
    pub to: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
