//! Crucible - cached Rust CI environment provisioner
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use crucible::cli::{Cli, Commands};
use crucible::config::ConfigManager;
use crucible::error::CrucibleResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CrucibleResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("crucible=warn"),
        1 => EnvFilter::new("crucible=info"),
        _ => EnvFilter::new("crucible=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| crucible::error::CrucibleError::io("getting current directory", e))?;
        let found = ConfigManager::find_local_config(&cwd);
        if let Some(ref path) = found {
            debug!("Found local config: {}", path.display());
        }
        found
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    // Dispatch to command
    match cli.command {
        Commands::Check(args) => crucible::cli::commands::check(args, &config).await,
        Commands::FmtCheck(args) => crucible::cli::commands::fmt_check(args, &config).await,
        Commands::FmtFix(args) => crucible::cli::commands::fmt_fix(args, &config).await,
        Commands::Status => crucible::cli::commands::status(&config).await,
        Commands::Config(args) => crucible::cli::commands::config(args, &config).await,
    }
}
