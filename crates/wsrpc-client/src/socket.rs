//! WebSocket client for calling a wsrpc server.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use wsrpc_protocol::Params;

use crate::error::ClientResult;
use crate::invoker::WsInvoker;

/// Client bound to one server URL.
///
/// Holds a single connection, opened by [`RpcClient::connect`] and reused
/// by every call until [`RpcClient::disconnect`] or a transport failure.
pub struct RpcClient {
    url: String,
    timeout: Duration,
    invoker: WsInvoker,
}

impl RpcClient {
    /// Creates a new client. No connection is made until [`connect`](Self::connect).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            invoker: WsInvoker::disconnected(),
        }
    }

    /// Creates a client for the default local server address.
    pub fn with_defaults() -> Self {
        Self::new(
            wsrpc_server::server_url(wsrpc_server::default_listen_addr()),
            Duration::from_secs(5),
        )
    }

    /// Returns the server URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.invoker.is_connected()
    }

    /// Connects to the server. Does nothing if already connected.
    pub async fn connect(&mut self) -> ClientResult<()> {
        if self.invoker.is_connected() {
            return Ok(());
        }
        self.invoker = WsInvoker::connect(&self.url, self.timeout).await?;
        debug!(url = %self.url, "connected");
        Ok(())
    }

    /// Closes the connection, if any.
    pub async fn disconnect(&mut self) -> ClientResult<()> {
        self.invoker.close().await
    }

    /// Calls `method` on the server.
    pub async fn call(&mut self, method: &str, params: Params) -> ClientResult<Value> {
        self.invoker.call(method, params).await
    }

    /// Calls `method` and deserializes the result.
    pub async fn call_as<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Params,
    ) -> ClientResult<T> {
        self.invoker.call_as(method, params).await
    }
}
