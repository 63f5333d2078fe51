//! CLI argument definitions for the Latemark binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use latemark::constants::{
    DEFAULT_ENDPOINT, DEFAULT_PROBE_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SYNC_TIMES,
};

/// Latemark offline-first late-arrival recorder
#[derive(Parser, Debug)]
#[command(name = "latemark")]
#[command(about = "Latemark: record late arrivals offline, sync them when you can")]
#[command(version)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a late mark on this device
    Mark(MarkArgs),
    /// List marks waiting to be synced
    Pending(QueueArgs),
    /// Discard every queued mark without sending it
    Purge(QueueArgs),
    /// Send queued marks to the remote store once
    Sync(SyncArgs),
    /// Keep syncing in the background on connectivity changes and a daily schedule
    Agent(AgentArgs),
    /// Run the remote store's batch endpoint
    Serve(ServeArgs),
    /// Check health of a running Latemark server
    Health(HealthArgs),
}

/// Location of the device-side queue
#[derive(clap::Args, Debug, Clone)]
pub struct QueueArgs {
    /// Data directory for the queue database.
    /// Stores latemark-queue.db
    #[arg(short = 'D', long, env = "LATEMARK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Where and how to reach the remote store
#[derive(clap::Args, Debug, Clone)]
pub struct EndpointArgs {
    /// Base URL of the remote store
    #[arg(short, long, default_value = DEFAULT_ENDPOINT, env = "LATEMARK_ENDPOINT")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Arguments for the mark command
#[derive(clap::Args, Debug)]
pub struct MarkArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    /// Subject (learner) id
    #[arg(long)]
    pub subject: i64,

    /// Context (session) id
    #[arg(long)]
    pub context: i64,

    /// Actor (operator) id
    #[arg(long)]
    pub actor: i64,

    /// Event date as YYYY-MM-DD; defaults to today
    #[arg(long)]
    pub date: Option<String>,
}

/// Arguments for the sync command
#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    #[command(flatten)]
    pub remote: EndpointArgs,
}

/// Arguments for the agent command
#[derive(clap::Args, Debug)]
pub struct AgentArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    #[command(flatten)]
    pub remote: EndpointArgs,

    /// Comma-separated daily sync times (HH:MM); empty disables the schedule
    #[arg(long, default_value = DEFAULT_SYNC_TIMES, env = "LATEMARK_SYNC_TIMES")]
    pub sync_times: String,

    /// Seconds between reachability probes
    #[arg(long, default_value_t = DEFAULT_PROBE_INTERVAL_SECS)]
    pub probe_interval: u64,
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "LATEMARK_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "LATEMARK_HOST")]
    pub host: String,

    /// Data directory for storage files.
    /// Stores latemark-records.db
    #[arg(short = 'D', long, env = "LATEMARK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(short, long, default_value = DEFAULT_ENDPOINT, env = "LATEMARK_ENDPOINT")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
