//! wsrpc CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use wsrpc_client::cli::{Cli, Command, ConfigAction};
use wsrpc_client::config::ClientConfig;
use wsrpc_client::error::{ClientError, ClientResult};
use wsrpc_client::commands;
use wsrpc_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = match cli.log_format.parse::<TracingOutputFormat>() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = match (&cli.command, cli.debug) {
        (_, true) => TracingConfig::cli_debug(),
        (Command::Server { .. }, false) => TracingConfig::server(),
        _ => TracingConfig::default(),
    };
    if let Err(e) = init_tracing(tracing_config.with_format(format)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let (config, source) = match cli.config {
        Some(path) => (ClientConfig::load_from(&path).map_err(ClientError::Config)?, path),
        None => (
            ClientConfig::load().map_err(ClientError::Config)?,
            ClientConfig::default_path(),
        ),
    };

    match cli.command {
        Command::Call {
            method,
            params,
            url,
            timeout,
        } => commands::call::run(&method, &params, url, timeout, &config).await,
        Command::Server { port } => commands::server::run(port, &config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &source),
            ConfigAction::Path => commands::config::path(&source),
        },
    }
}
