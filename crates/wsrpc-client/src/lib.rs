//! Call invoker, CLI and configuration
//!
//! This crate provides the client side of wsrpc and the `wsrpc`
//! command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod invoker;
pub mod socket;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use invoker::{Invoker, WsInvoker};
pub use socket::RpcClient;
