//! WebSocket listener.
//!
//! Accepts TCP connections, upgrades them to WebSocket and hands each one to
//! its own dispatcher task. The handshake runs inside that task so a slow
//! client never holds up the accept loop.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, debug, error, info, info_span, warn};

use wsrpc_protocol::{ServerChannel, websocket_config};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::registry::MethodRegistry;

/// WebSocket server dispatching calls against one registry.
pub struct WsServer {
    /// Server configuration.
    config: ServerConfig,
    /// TCP listener.
    listener: TcpListener,
    /// Semaphore for limiting concurrent connections.
    connection_semaphore: Arc<Semaphore>,
    /// Cloned into every connection task.
    dispatcher: Dispatcher,
}

impl WsServer {
    /// Binds the listener described by `config`.
    ///
    /// The registry is shared read-only by every connection.
    pub async fn bind(config: ServerConfig, registry: Arc<MethodRegistry>) -> ServerResult<Self> {
        if config.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }

        let listener = TcpListener::bind(config.listen_addr).await?;
        info!(
            addr = %listener.local_addr()?,
            methods = ?registry.names(),
            "WebSocket server listening"
        );

        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Ok(Self {
            config,
            listener,
            connection_semaphore,
            dispatcher: Dispatcher::new(registry),
        })
    }

    /// Returns the address actually bound, useful with port 0.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop, spawning one task per connection.
    ///
    /// Accept errors are logged and the loop keeps going.
    pub async fn run(&self) -> ServerResult<()> {
        loop {
            let Ok(permit) = self.connection_semaphore.clone().acquire_owned().await else {
                return Ok(());
            };

            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "Accepted TCP connection");
                    let dispatcher = self.dispatcher.clone();
                    let timeout = self.config.handshake_timeout;
                    tokio::spawn(
                        serve_connection(stream, dispatcher, timeout, permit)
                            .instrument(info_span!("connection", %peer)),
                    );
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// Connections already being served keep running until their peers
    /// close them.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    dispatcher: Dispatcher,
    handshake_timeout: Duration,
    _permit: OwnedSemaphorePermit,
) {
    let channel = match upgrade(stream, handshake_timeout).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(error = %e, "WebSocket handshake failed");
            return;
        }
    };

    debug!("Connection open");
    match dispatcher.serve(channel).await {
        Ok(()) => debug!("Connection closed"),
        Err(e) => warn!(error = %e, "Connection ended with error"),
    }
}

async fn upgrade(stream: TcpStream, timeout: Duration) -> ServerResult<ServerChannel> {
    let handshake = tokio_tungstenite::accept_async_with_config(stream, Some(websocket_config()));
    let ws = tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| ServerError::HandshakeTimeout(timeout))?
        .map_err(wsrpc_protocol::TransportError::from)?;
    Ok(ServerChannel::new(ws))
}
