//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use wsrpc_protocol::Params;

use crate::error::{ClientError, ClientResult};

/// wsrpc - call methods on a JSON-RPC server over WebSocket
#[derive(Debug, Parser)]
#[command(name = "wsrpc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "WSRPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format (pretty, compact, json)
    #[arg(long, env = "WSRPC_LOG_FORMAT", default_value = "compact")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Call a method and print its result as JSON
    Call {
        /// Method name
        method: String,

        /// Parameters as key=value pairs; values are parsed as JSON and
        /// fall back to plain strings
        params: Vec<String>,

        /// Server URL
        #[arg(long, env = "WSRPC_URL")]
        url: Option<String>,

        /// Connect and call timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Start the server in the foreground
    Server {
        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

/// Builds call parameters from `key=value` arguments.
///
/// `a=5` gives the number 5, `name="x"` and `name=x` both give the string
/// `"x"`, and `list=[1,2]` gives an array.
pub fn parse_key_values(args: &[String]) -> ClientResult<Params> {
    let mut params = Params::new();
    for arg in args {
        let (key, raw) = arg.split_once('=').ok_or_else(|| {
            ClientError::InvalidArgument(format!("expected key=value, got '{}'", arg))
        })?;
        if key.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "empty parameter name in '{}'",
                arg
            )));
        }
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        if params.insert(key.to_string(), value).is_some() {
            return Err(ClientError::InvalidArgument(format!(
                "parameter '{}' given twice",
                key
            )));
        }
    }
    Ok(params)
}
