//! Method registry: the allow-list of callable methods.
//!
//! The registry is assembled once with [`RegistryBuilder`] and is read-only
//! afterwards, so connections share it through an `Arc` without locking.
//! Names resolve by exact match only.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use wsrpc_protocol::Params;

use crate::error::{ServerError, ServerResult};

/// Result of invoking a method.
pub type HandlerResult = Result<Value, HandlerError>;

/// Future returned by every invocable, whatever its capability.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

type Invocable = Arc<dyn Fn(Params) -> HandlerFuture + Send + Sync>;

/// Failure raised by a method handler.
///
/// Only the message reaches the caller, as an internal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Parameters did not match what the method expects.
    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self::new(format!("invalid params: {}", detail))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Deserializes named parameters into a typed argument struct.
pub fn parse_params<T: DeserializeOwned>(params: Params) -> Result<T, HandlerError> {
    serde_json::from_value(Value::Object(params)).map_err(HandlerError::invalid_params)
}

/// Whether a method completes on invocation or needs to suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Sync,
    Async,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

/// A registered method.
///
/// Both capabilities are stored as the same future-returning invocable;
/// a sync method yields an already-completed future.
#[derive(Clone)]
pub struct Method {
    capability: Capability,
    invocable: Invocable,
}

impl Method {
    /// Wraps a function that completes immediately.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Params) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            capability: Capability::Sync,
            invocable: Arc::new(move |params: Params| -> HandlerFuture {
                let result = f(params);
                Box::pin(std::future::ready(result))
            }),
        }
    }

    /// Wraps a function returning a future that completes later.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            capability: Capability::Async,
            invocable: Arc::new(move |params: Params| -> HandlerFuture {
                Box::pin(f(params))
            }),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Starts the method. The returned future must be awaited for either
    /// capability.
    pub fn invoke(&self, params: Params) -> HandlerFuture {
        (self.invocable)(params)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Immutable name to method table.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Method>,
}

impl MethodRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks a method up by exact name.
    pub fn resolve(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Collects methods before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    methods: HashMap<String, Method>,
}

impl RegistryBuilder {
    /// Adds a method under `name`.
    ///
    /// # Errors
    ///
    /// Fails on an empty name or a name that is already registered.
    pub fn register(&mut self, name: impl Into<String>, method: Method) -> ServerResult<&mut Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ServerError::EmptyMethodName);
        }
        if self.methods.contains_key(&name) {
            return Err(ServerError::duplicate_method(name));
        }

        debug!(method = %name, capability = %method.capability, "Registering method");
        self.methods.insert(name, method);
        Ok(self)
    }

    /// Adds a method that completes immediately.
    pub fn register_sync<F>(&mut self, name: impl Into<String>, f: F) -> ServerResult<&mut Self>
    where
        F: Fn(Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(name, Method::sync(f))
    }

    /// Adds a method that completes asynchronously.
    pub fn register_async<F, Fut>(
        &mut self,
        name: impl Into<String>,
        f: F,
    ) -> ServerResult<&mut Self>
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(name, Method::asynchronous(f))
    }

    /// Freezes the registry.
    pub fn build(self) -> MethodRegistry {
        MethodRegistry {
            methods: self.methods,
        }
    }
}
