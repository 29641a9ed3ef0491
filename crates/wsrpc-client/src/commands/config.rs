//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the effective configuration as TOML, headed by the file it came
/// from.
pub fn dump(config: &ClientConfig, source: &Path) -> ClientResult<()> {
    println!("{}", render(config, source)?);
    Ok(())
}

/// Prints the configuration file path and whether it exists.
pub fn path(source: &Path) -> ClientResult<()> {
    let state = if source.exists() { "" } else { " (not found, using defaults)" };
    println!("config: {}{}", source.display(), state);
    Ok(())
}

fn render(config: &ClientConfig, source: &Path) -> ClientResult<String> {
    let body = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# {}\n{}", source.display(), body))
}
