//! Server error types.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (encoding a response).
    #[error("Protocol error: {0}")]
    Protocol(#[from] wsrpc_protocol::ProtocolError),

    /// The connection's channel failed or was closed mid-response.
    #[error("Transport error: {0}")]
    Transport(#[from] wsrpc_protocol::TransportError),

    /// WebSocket handshake did not finish in time.
    #[error("WebSocket handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// A method with this name is already registered.
    #[error("Method already registered: {name}")]
    DuplicateMethod { name: String },

    /// Method names must be non-empty.
    #[error("Method name must not be empty")]
    EmptyMethodName,

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a duplicate method error.
    pub fn duplicate_method(name: impl Into<String>) -> Self {
        Self::DuplicateMethod { name: name.into() }
    }
}
