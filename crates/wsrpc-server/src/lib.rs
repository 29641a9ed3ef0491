//! Server side of wsrpc: method registry, request dispatcher, WebSocket
//! listener.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use wsrpc_server::{MethodRegistry, ServerConfig, WsServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = MethodRegistry::builder();
//!     builder.register_sync("ping", |_| Ok(json!("pong")))?;
//!
//!     let server = WsServer::bind(ServerConfig::default(), Arc::new(builder.build())).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatcher;
mod error;
pub mod methods;
mod registry;
mod signals;
mod socket;

pub use config::{DEFAULT_PORT, ServerConfig, default_listen_addr, server_url};
pub use dispatcher::Dispatcher;
pub use error::{ServerError, ServerResult};
pub use registry::{
    Capability, HandlerError, HandlerFuture, HandlerResult, Method, MethodRegistry,
    RegistryBuilder, parse_params,
};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use socket::WsServer;
