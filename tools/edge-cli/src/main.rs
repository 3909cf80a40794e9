//! Edge CLI - Command line tool for the edge cache worker.
//!
//! Commands:
//! - `edge key` - Show the cache key a request normalizes to
//! - `edge check` - Show whether a request is cached, bypassed or purges
//! - `edge purge` - Purge a zone through the worker's purge path
//! - `edge config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{CheckArgs, ConfigArgs, KeyArgs, PurgeArgs};
use edge_observability::{init_logging, LogFormat};

/// Edge CLI - Inspect and operate the edge cache worker
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cache key for a request
    Key(KeyArgs),

    /// Show the cache decision for a request
    Check(CheckArgs),

    /// Purge every cached entry of a zone
    Purge(PurgeArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    let (format, filter) = match (cli.json, output.is_verbose()) {
        (true, _) => (LogFormat::Json, "warn"),
        (false, true) => (LogFormat::Human, "debug"),
        (false, false) => (LogFormat::Human, "warn"),
    };
    if let Err(e) = init_logging(format, filter) {
        output.warn(&format!("Logging disabled: {}", e));
    }

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Key(args) => commands::key::run(args, &ctx).await,
        Commands::Check(args) => commands::check::run(args, &ctx).await,
        Commands::Purge(args) => commands::purge::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
