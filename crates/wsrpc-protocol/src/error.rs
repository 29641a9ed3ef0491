//! Protocol and transport error types.

use thiserror::Error;

use crate::types::Id;

/// Result type for codec operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Result type for channel operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound text is not a valid envelope for its role.
    ///
    /// `id` holds the correlation id when the text was valid JSON with an
    /// integer `id` member, so the failure can still be answered in kind.
    #[error("malformed message: {reason}")]
    MalformedMessage { reason: String, id: Id },

    /// Envelope exceeds [`crate::MAX_MESSAGE_SIZE`] once encoded.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Failed to serialize an envelope to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Creates a malformed message error.
    pub fn malformed(reason: impl Into<String>, id: Id) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
            id,
        }
    }

    /// Correlation id recovered from the offending message, if any.
    pub fn recovered_id(&self) -> Id {
        match self {
            Self::MalformedMessage { id, .. } => *id,
            _ => None,
        }
    }
}

/// Errors raised by a [`crate::MessageChannel`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel was closed locally or the peer went away.
    #[error("channel closed")]
    Closed,

    /// WebSocket protocol or connection failure.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// IO error on the underlying stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::Closed,
            WsError::Io(io) => Self::Io(io),
            other => Self::WebSocket(Box::new(other)),
        }
    }
}
