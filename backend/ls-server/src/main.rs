use ls_server::{Cli, Commands, ServerResult, logger, pair_command, serve_command};

use std::process::ExitCode;

use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    // Load and validate configuration
    let config = ls_config::Config::load()?;
    config.validate()?;

    match cli.command {
        Commands::Serve(args) => {
            // Initialize logger (before any other logging)
            let log_file = logger::log_file_path(&config)?;
            logger::initialize(config.logging.level, log_file, config.logging.colored)?;

            info!("Starting ls-server v{}", env!("CARGO_PKG_VERSION"));
            config.log_summary();

            serve_command::run(&config, args).await
        }
        // stdout carries the data URI, so no logger
        Commands::Pair(args) => pair_command::run(&config.pairing, args),
    }
}
