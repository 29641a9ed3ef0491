//! Envelope types, codec and message channels for wsrpc.
//!
//! wsrpc speaks a JSON-RPC 2.0 style protocol over any duplex channel that
//! carries whole text messages (in practice a WebSocket connection).
//!
//! # Envelopes
//!
//! ```text
//! request:  {"jsonrpc":"2.0","method":"add","params":{"a":5,"b":3},"id":1}
//! success:  {"jsonrpc":"2.0","result":8,"id":1}
//! failure:  {"jsonrpc":"2.0","error":{"code":-32601,"message":"..."},"id":1}
//! ```
//!
//! Every request receives exactly one response carrying the same `id`. The
//! `id` is `null` only when the request text was too broken to recover it.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use wsrpc_protocol::{Request, decode_request, encode_request, params};
//!
//! let request = Request::new("add", params(json!({"a": 5, "b": 3})), 1_i64);
//! let text = encode_request(&request).unwrap();
//! assert_eq!(decode_request(&text).unwrap(), request);
//! ```

mod channel;
mod codec;
mod error;
mod types;
mod websocket;

pub use channel::{MemoryChannel, MessageChannel, memory_pair};
pub use codec::{decode_request, decode_response, encode_request, encode_response};
pub use error::{ProtocolError, ProtocolResult, TransportError, TransportResult};
pub use types::{ErrorCode, ErrorObject, Id, Outcome, Params, Request, Response, Version, params};
pub use websocket::{ClientChannel, ServerChannel, WebSocketChannel, websocket_config};

/// Value of the `jsonrpc` member on every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Maximum encoded envelope size (1 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
