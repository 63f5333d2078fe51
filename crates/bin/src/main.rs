use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;
mod storage;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so table and JSON output stay clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("latemark=info".parse()?))
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Mark(args) => commands::queue::mark(&args, format).await,
        Commands::Pending(args) => commands::queue::pending(&args, format).await,
        Commands::Purge(args) => commands::queue::purge(&args, format).await,
        Commands::Sync(args) => commands::sync::run(&args, format).await,
        Commands::Agent(args) => commands::agent::run(&args).await,
        Commands::Serve(args) => commands::serve::run(&args).await,
        Commands::Health(args) => commands::health::run(&args).await,
    }
}
