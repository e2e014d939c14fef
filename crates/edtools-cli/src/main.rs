mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::commands::CommandContext;
use crate::error::{CliError, Result};
use clap::Parser;
use edtools::engine::batch::BatchPool;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 edtools v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let app_config = config::build_config(cli.config.as_deref(), &cli.set_values)?;
    let workers = cli.threads.unwrap_or(app_config.threads);
    info!("Using a batch pool of {} worker threads.", workers);
    let ctx = CommandContext {
        config: app_config,
        pool: BatchPool::new(workers)?,
        quiet: cli.quiet,
    };

    let command_result = match cli.command {
        Commands::Extract(args) => {
            info!("Dispatching to 'extract' command.");
            commands::extract::run(args, &ctx)
        }
        Commands::FindCell(args) => {
            info!("Dispatching to 'find-cell' command.");
            commands::find_cell::run(args, &ctx)
        }
        Commands::Cluster(args) => {
            info!("Dispatching to 'cluster' command.");
            commands::cluster::run(args, &ctx)
        }
        Commands::UpdateXds(args) => {
            info!("Dispatching to 'update-xds' command.");
            commands::update_xds::run(args, &ctx)
        }
        Commands::MakeXscale(args) => {
            info!("Dispatching to 'make-xscale' command.");
            commands::make_xscale::run(args, &ctx)
        }
    };

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            println!("✅ Command completed successfully.");
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
        }
    }

    command_result
}
