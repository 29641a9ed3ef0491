//! Client error types.

use std::fmt;

use wsrpc_protocol::TransportError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// `call` was invoked without an established connection.
    NotConnected,
    /// Connecting to the server failed (refused, unreachable, bad URL).
    Connection(String),
    /// The connection failed or closed while a call was in flight.
    Transport(TransportError),
    /// The server's reply could not be understood.
    Protocol(String),
    /// The server answered with an error response.
    Remote { code: i64, message: String },
    /// Request timed out.
    Timeout(String),
    /// Configuration error.
    Config(String),
    /// Invalid command-line argument.
    InvalidArgument(String),
    /// The local server failed to start or stopped with an error.
    Server(String),
    /// IO error.
    Io(std::io::Error),
}

impl ClientError {
    /// Remote error code, if this is a remote error.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected to a server"),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Remote { code, message } => write!(f, "server error {}: {}", code, message),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Self::Server(msg) => write!(f, "server error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<wsrpc_protocol::ErrorObject> for ClientError {
    fn from(err: wsrpc_protocol::ErrorObject) -> Self {
        Self::Remote {
            code: err.code,
            message: err.message,
        }
    }
}
