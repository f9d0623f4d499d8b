//! JobHub Executor - executor-side runtime for the JobHub scheduling center
//!
//! This is the main entry point for the executor binary. The executor
//! registers itself with the scheduling center, serves start/kill/log
//! requests on its control surface, runs job handlers, and reports
//! completions back to the center.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use jobhub_executor::cli::{Cli, Commands, ConfigSubcommand};
use jobhub_executor::config::{self, ExecutorConfig};
use jobhub_executor::error::{Error, Result};
use jobhub_executor::executor::Executor;
use jobhub_executor::{handlers, logging, version};

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    // Commands that don't need the full logging stack
    match &cli.command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand.clone());
        }
        Commands::Run { .. } => {}
    }

    let config_path = match &cli.command {
        Commands::Run { config } => config.clone(),
        _ => None,
    };

    // Load config (or use defaults)
    let config = match ExecutorConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    };

    // Initialize logging with config settings
    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting JobHub executor"
    );

    if let Err(e) = run_executor(config) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Run the executor in normal operation mode
fn run_executor(config: ExecutorConfig) -> Result<()> {
    info!(
        bind = %config.executor.bind_addr()?,
        advertised = %config.executor.advertised_address(),
        registry_key = %config.executor.registry_key(),
        center = %config.center.address,
        on_duplicate = %config.executor.duplicate_policy().as_str(),
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("jobhub-executor")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(async {
        let executor = Executor::new(config)?;
        handlers::register_builtins(&executor);
        Arc::new(executor).run().await
    })
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = ExecutorConfig::load(config.as_deref())?;
            let rendered = toml::to_string_pretty(&cfg)
                .map_err(|e| Error::Internal(format!("Failed to render config: {}", e)))?;
            println!("{}", rendered);
        }
        ConfigSubcommand::Init { path, force } => {
            config::init_config(path.as_deref(), force)?;
        }
        ConfigSubcommand::Validate { config } => {
            match ExecutorConfig::load(config.as_deref()) {
                Ok(_) => {
                    println!("Configuration is valid.");
                }
                Err(e) => {
                    eprint!("{}", e.format_for_terminal());
                    std::process::exit(e.exit_code());
                }
            }
        }
    }

    Ok(())
}
