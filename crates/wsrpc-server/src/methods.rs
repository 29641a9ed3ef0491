//! Example business methods exposed by the `wsrpc server` command.

use serde::Deserialize;
use serde_json::{Number, Value};

use wsrpc_protocol::Params;

use crate::error::ServerResult;
use crate::registry::{HandlerError, HandlerResult, MethodRegistry, parse_params};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddParams {
    a: Number,
    b: Number,
}

/// Adds two JSON numbers.
///
/// Two integers add exactly, across the whole `i64` and `u64` range; a sum
/// outside both is an error. Anything else adds as `f64`.
pub fn add(a: &Number, b: &Number) -> HandlerResult {
    if let (Some(x), Some(y)) = (as_integer(a), as_integer(b)) {
        let sum = x + y;
        if let Ok(sum) = i64::try_from(sum) {
            return Ok(Value::from(sum));
        }
        return u64::try_from(sum)
            .map(Value::from)
            .map_err(|_| HandlerError::new(format!("integer overflow adding {} and {}", a, b)));
    }

    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Number::from_f64(x + y)
            .map(Value::Number)
            .ok_or_else(|| HandlerError::new("sum is not a finite number")),
        _ => Err(HandlerError::new("operands are not representable as f64")),
    }
}

/// Widens an integer operand. `None` for floats.
fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn add_params(params: Params) -> HandlerResult {
    let AddParams { a, b } = parse_params(params)?;
    add(&a, &b)
}

async fn add_params_async(params: Params) -> HandlerResult {
    tokio::task::yield_now().await;
    add_params(params)
}

/// Builds the allow-list served by default.
///
/// `add_two_numbers` stays registered for callers using the older name.
pub fn builtin_registry() -> ServerResult<MethodRegistry> {
    let mut builder = MethodRegistry::builder();
    builder
        .register_sync("add", add_params)?
        .register_sync("add_two_numbers", add_params)?
        .register_async("add_async", add_params_async)?;
    Ok(builder.build())
}
