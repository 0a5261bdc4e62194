//! RDA Server - Main entry point

use clap::Parser;
use rda_common::logging::{init_logging, LogConfig, LogLevel};
use std::process;
use tracing::{error, info};

use rda_server::{cli, config::Config, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("rda-server")
        .filter_directives("aws_config=warn,aws_smithy_runtime=warn,hyper=warn")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {e}");
            log_config
        },
    };

    let guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            None
        },
    };

    let code = execute(&cli).await;

    // Flush file logging before exiting
    drop(guard);
    process::exit(code);
}

async fn execute(cli: &Cli) -> i32 {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            eprintln!("Error: {e:#}");
            return 2;
        },
    };
    info!(source = %config.source, "Configuration loaded");

    match cli::run(cli, &config).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            1
        },
    }
}
