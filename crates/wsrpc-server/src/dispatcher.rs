//! Request dispatcher: the per-connection server loop.
//!
//! One [`Dispatcher::serve`] call runs per connection. It reads a message,
//! answers it, and only then reads the next one, so responses leave in the
//! order requests arrived and each connection has at most one call in flight.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tracing::{Span, debug, warn};

use wsrpc_protocol::{
    ErrorObject, Id, MessageChannel, Params, Request, Response, decode_request, encode_response,
};

use crate::error::ServerResult;
use crate::registry::{Method, MethodRegistry};

/// Resolves and runs requested methods against a shared registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MethodRegistry>) -> Self {
        Self { registry }
    }

    /// Answers one inbound message.
    ///
    /// Malformed input is answered with an internal error rather than
    /// dropped; its id is `null` unless it could be recovered.
    pub async fn handle_text(&self, text: &str) -> Response {
        match decode_request(text) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                let id = e.recovered_id();
                warn!(error = %e, id = ?id, "Malformed inbound message");
                Response::error(id, ErrorObject::internal(e.to_string()))
            }
        }
    }

    /// Resolves and invokes a decoded request.
    ///
    /// Handler failures, including panics, become internal errors carrying
    /// the failure text. The response always carries the request's id.
    #[tracing::instrument(
        name = "call",
        skip(self, request),
        fields(method = %request.method, id = ?request.id, capability, duration_ms)
    )]
    pub async fn handle_request(&self, request: Request) -> Response {
        let start = Instant::now();
        let Request {
            method, params, id, ..
        } = request;

        let response = match self.registry.resolve(&method) {
            Some(entry) => {
                Span::current().record("capability", tracing::field::display(entry.capability()));
                invoke(entry, id, params).await
            }
            None => {
                debug!("Method not found");
                Response::error(id, ErrorObject::method_not_found(&method))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        Span::current().record("duration_ms", duration_ms);
        debug!(
            success = response.is_success(),
            duration_ms,
            "Request handled"
        );

        response
    }

    /// Serves one connection until the peer closes it.
    ///
    /// Returns `Ok(())` on a clean close and an error when the channel fails;
    /// a failed send ends the connection without retrying.
    pub async fn serve<C: MessageChannel>(&self, mut channel: C) -> ServerResult<()> {
        loop {
            let text = match channel.receive().await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!("Peer closed connection");
                    if let Err(e) = channel.close().await {
                        debug!(error = %e, "Error closing channel");
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Error receiving message");
                    return Err(e.into());
                }
            };

            let response = self.handle_text(&text).await;
            let encoded = match encode_response(&response) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(error = %e, id = ?response.id, "Failed to encode response");
                    encode_response(&Response::error(
                        response.id,
                        ErrorObject::internal(e.to_string()),
                    ))?
                }
            };

            if let Err(e) = channel.send(encoded).await {
                debug!(error = %e, id = ?response.id, "Failed to send response");
                return Err(e.into());
            }
        }
    }
}

/// Runs one handler, turning failures and panics into internal errors.
async fn invoke(entry: &Method, id: Id, params: Params) -> Response {
    // Invoke inside the guarded future so a panicking sync handler is
    // caught too.
    let outcome = AssertUnwindSafe(async { entry.invoke(params).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => Response::success(id, value),
        Ok(Err(e)) => {
            debug!(error = %e, "Handler failed");
            Response::error(id, ErrorObject::internal(e.to_string()))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(panic = %message, "Handler panicked");
            Response::error(id, ErrorObject::internal(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::sync::Notify;
    use wsrpc_protocol::{MemoryChannel, Outcome, TransportError, decode_response, memory_pair};

    use wsrpc_protocol::Params;

    use crate::error::ServerError;
    use crate::registry::{HandlerError, HandlerResult};

    fn test_registry(gate: Arc<Notify>) -> Arc<MethodRegistry> {
        let mut builder = MethodRegistry::builder();
        builder
            .register_sync("add", |p| {
                let a = p.get("a").and_then(Value::as_i64).unwrap_or_default();
                let b = p.get("b").and_then(Value::as_i64).unwrap_or_default();
                Ok(json!(a + b))
            })
            .unwrap()
            .register_sync("fail", |_| Err(HandlerError::new("division by zero")))
            .unwrap()
            .register_sync("explode", |_| panic!("kaboom"))
            .unwrap()
            .register_async("explode_later", explode_later)
            .unwrap()
            .register_async("fail_later", fail_later)
            .unwrap()
            .register_async("wait", move |_| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok(json!("released"))
                }
            })
            .unwrap()
            .register_async("slow", |_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("slow"))
            })
            .unwrap();
        Arc::new(builder.build())
    }

    async fn fail_later(_: Params) -> HandlerResult {
        tokio::task::yield_now().await;
        Err(HandlerError::new("backend unavailable"))
    }

    async fn explode_later(_: Params) -> HandlerResult {
        tokio::task::yield_now().await;
        panic!("later kaboom")
    }

    fn spawn_connection(
        dispatcher: &Dispatcher,
    ) -> (MemoryChannel, tokio::task::JoinHandle<ServerResult<()>>) {
        let (client, server) = memory_pair();
        let dispatcher = dispatcher.clone();
        let task = tokio::spawn(async move { dispatcher.serve(server).await });
        (client, task)
    }

    async fn exchange(channel: &mut MemoryChannel, text: &str) -> Value {
        channel.send(text.to_string()).await.unwrap();
        let reply = channel.receive().await.unwrap().expect("response");
        serde_json::from_str(&reply).unwrap()
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(test_registry(Arc::new(Notify::new())))
    }

    #[tokio::test]
    async fn add_positive() {
        let (mut client, _task) = spawn_connection(&dispatcher());
        let reply = exchange(
            &mut client,
            r#"{"jsonrpc":"2.0","method":"add","params":{"a":5,"b":3},"id":1}"#,
        )
        .await;
        assert_eq!(reply, json!({"jsonrpc": "2.0", "result": 8, "id": 1}));
    }

    #[tokio::test]
    async fn add_mixed_signs() {
        let (mut client, _task) = spawn_connection(&dispatcher());
        let reply = exchange(
            &mut client,
            r#"{"method":"add","params":{"a":-10,"b":5},"id":1}"#,
        )
        .await;
        assert_eq!(reply["result"], json!(-5));
        assert_eq!(reply["id"], json!(1));
    }

    #[tokio::test]
    async fn unknown_method() {
        let (mut client, _task) = spawn_connection(&dispatcher());
        let reply = exchange(
            &mut client,
            r#"{"jsonrpc":"2.0","method":"frobnicate","params":{},"id":17}"#,
        )
        .await;
        assert_eq!(
            reply,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "method 'frobnicate' not found"},
                "id": 17
            })
        );
    }

    #[tokio::test]
    async fn async_handler_failure_is_internal_error() {
        let (mut client, _task) = spawn_connection(&dispatcher());

        let reply = exchange(&mut client, r#"{"jsonrpc":"2.0","method":"fail_later","id":42}"#).await;
        assert_eq!(
            reply,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32603, "message": "backend unavailable"},
                "id": 42
            })
        );

        let reply = exchange(&mut client, r#"{"method":"add","params":{"a":2,"b":2},"id":43}"#).await;
        assert_eq!(reply["result"], json!(4));
    }

    /// Collects the names of span fields recorded after span creation.
    #[derive(Clone, Default)]
    struct RecordedFields(Arc<std::sync::Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for RecordedFields {
        fn on_record(
            &self,
            _span: &tracing::span::Id,
            values: &tracing::span::Record<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            struct Names<'a>(&'a mut Vec<String>);

            impl tracing::field::Visit for Names<'_> {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    _value: &dyn std::fmt::Debug,
                ) {
                    self.0.push(field.name().to_string());
                }
            }

            let mut names = self.0.lock().unwrap();
            values.record(&mut Names(&mut names));
        }
    }

    async fn recorded_fields(method: &str) -> Vec<String> {
        use tracing_subscriber::layer::SubscriberExt;

        let fields = RecordedFields::default();
        let subscriber = tracing_subscriber::registry().with(fields.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        dispatcher()
            .handle_request(Request::new(method, Params::new(), 1_i64))
            .await;

        let names = fields.0.lock().unwrap().clone();
        names
    }

    #[tokio::test]
    async fn call_span_records_duration_for_every_outcome() {
        let found = recorded_fields("add").await;
        assert!(found.contains(&"capability".to_string()), "{found:?}");
        assert!(found.contains(&"duration_ms".to_string()), "{found:?}");

        let missing = recorded_fields("frobnicate").await;
        assert!(missing.contains(&"duration_ms".to_string()), "{missing:?}");
        assert!(!missing.contains(&"capability".to_string()), "{missing:?}");
    }

    #[tokio::test]
    async fn handler_failure_keeps_connection_open() {
        let (mut client, task) = spawn_connection(&dispatcher());

        let reply = exchange(&mut client, r#"{"method":"fail","id":1}"#).await;
        assert_eq!(reply["error"]["code"], json!(-32603));
        assert_eq!(reply["error"]["message"], json!("division by zero"));
        assert_eq!(reply["id"], json!(1));

        let reply = exchange(&mut client, r#"{"method":"add","params":{"a":1,"b":2},"id":2}"#).await;
        assert_eq!(reply["result"], json!(3));
        assert!(!task.is_finished());
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let (mut client, _task) = spawn_connection(&dispatcher());

        let reply = exchange(&mut client, r#"{"method":"explode","id":1}"#).await;
        assert_eq!(reply["error"]["code"], json!(-32603));
        assert_eq!(reply["error"]["message"], json!("handler panicked: kaboom"));

        let reply = exchange(&mut client, r#"{"method":"explode_later","id":2}"#).await;
        assert_eq!(reply["error"]["code"], json!(-32603));
        assert_eq!(reply["id"], json!(2));

        let reply = exchange(&mut client, r#"{"method":"add","params":{"a":2,"b":2},"id":3}"#).await;
        assert_eq!(reply["result"], json!(4));
    }

    #[tokio::test]
    async fn malformed_input_is_answered_with_null_id() {
        let (mut client, _task) = spawn_connection(&dispatcher());

        let reply = exchange(&mut client, "definitely not json").await;
        assert_eq!(reply["error"]["code"], json!(-32603));
        assert_eq!(reply["id"], Value::Null);
        assert!(reply.get("result").is_none());
    }

    #[tokio::test]
    async fn malformed_input_with_id_keeps_it() {
        let (mut client, _task) = spawn_connection(&dispatcher());

        let reply = exchange(&mut client, r#"{"params":{},"id":8}"#).await;
        assert_eq!(reply["error"]["code"], json!(-32603));
        assert_eq!(reply["id"], json!(8));
    }

    #[tokio::test]
    async fn responses_follow_request_order() {
        let (mut client, _task) = spawn_connection(&dispatcher());

        // All three are queued before any answer is read; the slow async
        // call first must still be answered first.
        client.send(r#"{"method":"slow","id":1}"#.into()).await.unwrap();
        client
            .send(r#"{"method":"add","params":{"a":10,"b":20},"id":2}"#.into())
            .await
            .unwrap();
        client
            .send(r#"{"method":"add","params":{"a":100,"b":200},"id":3}"#.into())
            .await
            .unwrap();

        let mut ids = Vec::new();
        for _ in 0..3 {
            let text = client.receive().await.unwrap().unwrap();
            ids.push(decode_response(&text).unwrap().id);
        }
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn pending_async_call_does_not_block_other_connections() {
        let gate = Arc::new(Notify::new());
        let dispatcher = Dispatcher::new(test_registry(gate.clone()));

        let (mut waiting, _a) = spawn_connection(&dispatcher);
        let (mut other, _b) = spawn_connection(&dispatcher);

        waiting.send(r#"{"method":"wait","id":1}"#.into()).await.unwrap();

        let reply = exchange(&mut other, r#"{"method":"add","params":{"a":1,"b":1},"id":1}"#).await;
        assert_eq!(reply["result"], json!(2));

        let early = tokio::time::timeout(Duration::from_millis(50), waiting.receive()).await;
        assert!(early.is_err(), "wait answered before release");

        gate.notify_one();
        let text = waiting.receive().await.unwrap().unwrap();
        let response = decode_response(&text).unwrap();
        assert_eq!(response.outcome, Outcome::Result(json!("released")));
    }

    #[tokio::test]
    async fn clean_close_ends_task() {
        let (mut client, task) = spawn_connection(&dispatcher());
        client.close().await.unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn send_failure_ends_task() {
        let (mut client, task) = spawn_connection(&dispatcher());

        client.send(r#"{"method":"slow","id":1}"#.into()).await.unwrap();
        drop(client);

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(ServerError::Transport(TransportError::Closed))
        ));
    }

    #[tokio::test]
    async fn handle_request_directly() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .handle_request(Request::new(
                "add",
                wsrpc_protocol::params(json!({"a": 2, "b": 40})),
                5_i64,
            ))
            .await;
        assert_eq!(response, Response::success(Some(5), json!(42)));
    }
}
