//! Server command: serves the built-in methods in the foreground.

use std::sync::Arc;

use tracing::info;

use wsrpc_server::{SignalHandler, WsServer, methods::builtin_registry};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Starts the server and blocks until SIGINT/SIGTERM.
///
/// `port` overrides the configured port.
pub async fn run(port: Option<u16>, config: &ClientConfig) -> ClientResult<()> {
    let mut settings = config.server.clone();
    if let Some(port) = port {
        settings.port = port;
    }

    let registry = builtin_registry()
        .map_err(|e| ClientError::Server(format!("failed to build method registry: {}", e)))?;

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let server = WsServer::bind(settings.to_server_config(), Arc::new(registry))
        .await
        .map_err(|e| ClientError::Server(format!("failed to start server: {}", e)))?;

    let addr = server
        .local_addr()
        .map_err(|e| ClientError::Server(e.to_string()))?;
    info!(url = %wsrpc_server::server_url(addr), "server listening");

    server
        .run_until_shutdown(signal_handler.shutdown().wait())
        .await
        .map_err(|e| ClientError::Server(e.to_string()))?;

    info!("server stopped");
    Ok(())
}
