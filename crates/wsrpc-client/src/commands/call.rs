//! Call command: one request, result printed as JSON.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cli::parse_key_values;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::socket::RpcClient;

/// Calls `method` and prints the result to stdout.
///
/// `url` and `timeout` override the configured values.
pub async fn run(
    method: &str,
    args: &[String],
    url: Option<String>,
    timeout: Option<u64>,
    config: &ClientConfig,
) -> ClientResult<()> {
    let result = call(method, args, url, timeout, config).await?;
    println!("{}", render(&result)?);
    Ok(())
}

async fn call(
    method: &str,
    args: &[String],
    url: Option<String>,
    timeout: Option<u64>,
    config: &ClientConfig,
) -> ClientResult<Value> {
    let params = parse_key_values(args)?;
    let url = url.unwrap_or_else(|| config.client.url.clone());
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.client.timeout());

    let mut client = RpcClient::new(url, timeout);
    client.connect().await?;

    debug!(method, url = client.url(), "calling");
    let result = client.call(method, params).await;

    // The call outcome matters more than a failed close.
    if let Err(e) = client.disconnect().await {
        debug!(error = %e, "close failed");
    }
    result
}

fn render(value: &Value) -> ClientResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Protocol(format!("failed to render result: {}", e)))
}
