//! [`MessageChannel`] over a WebSocket connection.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::channel::MessageChannel;
use crate::error::{TransportError, TransportResult};
use crate::MAX_MESSAGE_SIZE;

/// Channel over a connection accepted by a server.
pub type ServerChannel = WebSocketChannel<TcpStream>;

/// Channel over a connection opened with `connect_async`.
pub type ClientChannel = WebSocketChannel<MaybeTlsStream<TcpStream>>;

/// Handshake configuration capping inbound messages and frames at
/// [`MAX_MESSAGE_SIZE`], so an oversized message fails the read instead of
/// being buffered whole.
pub fn websocket_config() -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(MAX_MESSAGE_SIZE))
        .max_frame_size(Some(MAX_MESSAGE_SIZE))
}

/// Adapts a WebSocket stream to a text-message channel.
///
/// Text frames pass through. Binary frames are decoded as UTF-8 (lossily) so
/// the receiver still gets something to answer. Control frames are handled
/// by tungstenite and never surface.
pub struct WebSocketChannel<S> {
    stream: WebSocketStream<S>,
    closed: bool,
}

impl<S> WebSocketChannel<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    /// Unwraps this channel, returning the underlying stream.
    pub fn into_inner(self) -> WebSocketStream<S> {
        self.stream
    }
}

impl<S> MessageChannel for WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, text: String) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn receive(&mut self) -> TransportResult<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => {
                    trace!(len = data.len(), "decoding binary frame as text");
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "peer closed websocket");
                    return Ok(None);
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(e) => {
                    return match TransportError::from(e) {
                        TransportError::Closed => Ok(None),
                        other => Err(other),
                    };
                }
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) => match TransportError::from(e) {
                TransportError::Closed => Ok(()),
                other => Err(other),
            },
        }
    }
}
