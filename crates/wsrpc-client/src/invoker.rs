//! Call invoker: the client side of one connection.
//!
//! An [`Invoker`] owns at most one outstanding call. `call` borrows the
//! invoker mutably, so a second call cannot start before the first one's
//! response has been consumed.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use wsrpc_protocol::{
    ClientChannel, MessageChannel, Params, Request, Response, TransportError, WebSocketChannel,
    decode_response, encode_request, websocket_config,
};

use crate::error::{ClientError, ClientResult};

/// Issues calls over a [`MessageChannel`] and pairs them with responses.
pub struct Invoker<C> {
    channel: Option<C>,
    /// Id for the next request. Starts at 1 and only grows.
    next_id: i64,
    timeout: Option<Duration>,
}

impl<C: MessageChannel> Default for Invoker<C> {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl<C: MessageChannel> Invoker<C> {
    /// Creates an invoker with no connection; calls fail with
    /// [`ClientError::NotConnected`] until a channel is attached.
    pub fn disconnected() -> Self {
        Self {
            channel: None,
            next_id: 1,
            timeout: None,
        }
    }

    pub fn with_channel(channel: C) -> Self {
        Self {
            channel: Some(channel),
            ..Self::disconnected()
        }
    }

    /// Builder: bound the wait for each response.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses `channel` for subsequent calls. Ids keep counting from where
    /// they were.
    pub fn attach(&mut self, channel: C) {
        self.channel = Some(channel);
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Calls `method` and returns its result.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] before any data is sent if no channel
    ///   is attached.
    /// - [`ClientError::Remote`] when the server answers with an error.
    /// - [`ClientError::Transport`] when the channel fails or closes; the
    ///   channel is detached.
    /// - [`ClientError::Timeout`] when no matching response arrives in time.
    pub async fn call(&mut self, method: &str, params: Params) -> ClientResult<Value> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        let id = self.next_id;
        self.next_id += 1;

        let text = encode_request(&Request::new(method, params, id))
            .map_err(|e| ClientError::Protocol(format!("failed to encode request: {}", e)))?;

        debug!(method, id, "sending request");
        if let Err(e) = channel.send(text).await {
            self.channel = None;
            return Err(ClientError::Transport(e));
        }

        let received = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, await_response(channel, id))
                .await
                .unwrap_or_else(|_| {
                    Err(ClientError::Timeout(format!(
                        "no response to '{}' (id {}) after {:?}",
                        method, id, timeout
                    )))
                }),
            None => await_response(channel, id).await,
        };

        let response = match received {
            Ok(response) => response,
            Err(ClientError::Transport(e)) => {
                self.channel = None;
                return Err(ClientError::Transport(e));
            }
            Err(e) => return Err(e),
        };

        debug!(method, id, success = response.is_success(), "response received");
        response.into_result().map_err(ClientError::from)
    }

    /// Calls `method` and deserializes its result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Params,
    ) -> ClientResult<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::Protocol(format!("unexpected result for '{}': {}", method, e)))
    }

    /// Closes and detaches the channel. Does nothing when disconnected.
    pub async fn close(&mut self) -> ClientResult<()> {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await?;
        }
        Ok(())
    }
}

/// Invoker over a WebSocket connection.
pub type WsInvoker = Invoker<ClientChannel>;

impl Invoker<ClientChannel> {
    /// Opens a WebSocket connection to `url`.
    ///
    /// `timeout` bounds the connection handshake and, once connected, the
    /// wait for each response.
    pub async fn connect(url: &str, timeout: Duration) -> ClientResult<Self> {
        debug!(url, "connecting to server");

        let handshake =
            tokio_tungstenite::connect_async_with_config(url, Some(websocket_config()), false);
        let (stream, _) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "connection to {} timed out after {:?}",
                    url, timeout
                ))
            })?
            .map_err(|e| ClientError::Connection(format!("failed to connect to {}: {}", url, e)))?;

        Ok(Self::with_channel(WebSocketChannel::new(stream)).with_timeout(timeout))
    }
}

/// Reads until the response for `id` arrives.
///
/// Responses for other ids are late answers to abandoned calls and are
/// dropped. A `null` id means the server could not read the request, and
/// only one request is outstanding, so it is taken as the answer.
async fn await_response<C: MessageChannel>(channel: &mut C, id: i64) -> ClientResult<Response> {
    loop {
        let text = channel
            .receive()
            .await?
            .ok_or(ClientError::Transport(TransportError::Closed))?;

        let response = decode_response(&text)
            .map_err(|e| ClientError::Protocol(format!("invalid response: {}", e)))?;

        match response.id {
            Some(received) if received == id => return Ok(response),
            None => {
                warn!(expected = id, "response has null id, pairing it with the outstanding call");
                return Ok(response);
            }
            Some(received) => {
                warn!(expected = id, received, "discarding response with unexpected id");
            }
        }
    }
}
