//! Request and response envelopes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;

use crate::JSONRPC_VERSION;

/// Named call parameters.
pub type Params = serde_json::Map<String, Value>;

/// Correlation id. `None` encodes as JSON `null`.
pub type Id = Option<i64>;

/// Builds [`Params`] from a JSON object value.
///
/// Anything other than an object yields empty params.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// The `jsonrpc` version tag. Only `"2.0"` is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag == JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(de::Error::custom(format_args!(
                "unsupported protocol version '{}'",
                tag
            )))
        }
    }
}

/// A call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol tag; defaults to "2.0" when absent on the wire.
    #[serde(default)]
    pub jsonrpc: Version,
    /// Method name, matched exactly against the server's registry.
    pub method: String,
    /// Named parameters; absent params decode as an empty object.
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub id: Id,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Params, id: impl Into<Id>) -> Self {
        Self {
            jsonrpc: Version,
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// Protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The requested method is not registered.
    MethodNotFound,
    /// The handler failed or the inbound message was malformed.
    InternalError,
}

impl ErrorCode {
    /// Wire value of the code.
    pub const fn code(self) -> i64 {
        match self {
            Self::MethodNotFound => -32601,
            Self::InternalError => -32603,
        }
    }

    /// Maps a wire value back to a known code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32601 => Some(Self::MethodNotFound),
            -32603 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Returns a human-readable description of the error code.
    pub fn description(self) -> &'static str {
        match self {
            Self::MethodNotFound => "Method not found",
            Self::InternalError => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// The `error` member of a failed response.
///
/// `code` stays a plain integer so codes from other implementations
/// survive decoding untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("method '{}' not found", method),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The known code this error carries, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// What a response carries: exactly one of a result or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

/// A call response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawResponse", try_from = "RawResponse")]
pub struct Response {
    pub jsonrpc: Version,
    pub outcome: Outcome,
    /// Id of the answered request; `None` if it could not be recovered.
    pub id: Id,
}

impl Response {
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            jsonrpc: Version,
            outcome: Outcome::Result(result),
            id,
        }
    }

    pub fn error(id: Id, error: ErrorObject) -> Self {
        Self {
            jsonrpc: Version,
            outcome: Outcome::Error(error),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    pub fn as_error(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            Outcome::Result(_) => None,
        }
    }

    /// Splits the response into the call's result or its error.
    pub fn into_result(self) -> Result<Value, ErrorObject> {
        match self.outcome {
            Outcome::Result(value) => Ok(value),
            Outcome::Error(error) => Err(error),
        }
    }
}

/// Wire shape of a response, before the result/error exclusivity check.
#[derive(Serialize, Deserialize)]
struct RawResponse {
    #[serde(default)]
    jsonrpc: Version,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorObject>,
    #[serde(deserialize_with = "nullable_id")]
    id: Id,
}

/// Keeps `"result": null` distinct from a missing `result`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Requires the `id` member while still allowing `null`.
fn nullable_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Id, D::Error> {
    Option::<i64>::deserialize(deserializer)
}

impl From<Response> for RawResponse {
    fn from(response: Response) -> Self {
        let (result, error) = match response.outcome {
            Outcome::Result(value) => (Some(value), None),
            Outcome::Error(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: response.jsonrpc,
            result,
            error,
            id: response.id,
        }
    }
}

impl TryFrom<RawResponse> for Response {
    type Error = String;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        let outcome = match (raw.result, raw.error) {
            (Some(value), None) => Outcome::Result(value),
            (None, Some(error)) => Outcome::Error(error),
            (Some(_), Some(_)) => return Err("response carries both result and error".into()),
            (None, None) => return Err("response carries neither result nor error".into()),
        };
        Ok(Self {
            jsonrpc: raw.jsonrpc,
            outcome,
            id: raw.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request = Request::new("add", params(json!({"a": 5, "b": 3})), 1_i64);
        let json = serde_json::to_string(&request).unwrap();
        insta::assert_snapshot!(json, @r#"{"jsonrpc":"2.0","method":"add","params":{"a":5,"b":3},"id":1}"#);
    }

    #[test]
    fn request_defaults_missing_members() {
        let request: Request = serde_json::from_str(r#"{"method":"ping"}"#).unwrap();
        assert_eq!(request.jsonrpc, Version);
        assert!(request.params.is_empty());
        assert_eq!(request.id, None);
    }

    #[test]
    fn request_rejects_other_versions() {
        let result: Result<Request, _> =
            serde_json::from_str(r#"{"jsonrpc":"1.0","method":"ping","id":1}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unsupported protocol version '1.0'"), "{err}");
    }

    #[test]
    fn request_rejects_non_object_params() {
        let result: Result<Request, _> =
            serde_json::from_str(r#"{"method":"add","params":[1,2],"id":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn success_wire_format() {
        let response = Response::success(Some(1), json!(8));
        let json = serde_json::to_string(&response).unwrap();
        insta::assert_snapshot!(json, @r#"{"jsonrpc":"2.0","result":8,"id":1}"#);
    }

    #[test]
    fn error_wire_format() {
        let response = Response::error(Some(4), ErrorObject::method_not_found("frobnicate"));
        let json = serde_json::to_string(&response).unwrap();
        insta::assert_snapshot!(json, @r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"method 'frobnicate' not found"},"id":4}"#);
    }

    #[test]
    fn null_id_is_serialized() {
        let response = Response::error(None, ErrorObject::internal("bad input"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.ends_with(r#""id":null}"#), "{json}");
    }

    #[test]
    fn null_result_is_a_success() {
        let response: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":null,"id":3}"#).unwrap();
        assert!(response.is_success());
        assert_eq!(response.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn response_requires_exactly_one_outcome() {
        let both = r#"{"jsonrpc":"2.0","result":1,"error":{"code":-32603,"message":"x"},"id":1}"#;
        let err = serde_json::from_str::<Response>(both).unwrap_err().to_string();
        assert!(err.contains("both result and error"), "{err}");

        let neither = r#"{"jsonrpc":"2.0","id":1}"#;
        let err = serde_json::from_str::<Response>(neither).unwrap_err().to_string();
        assert!(err.contains("neither result nor error"), "{err}");
    }

    #[test]
    fn response_requires_id_member() {
        let result = serde_json::from_str::<Response>(r#"{"jsonrpc":"2.0","result":1}"#);
        assert!(result.is_err());

        let response: Response =
            serde_json::from_str(r#"{"jsonrpc":"2.0","result":1,"id":null}"#).unwrap();
        assert_eq!(response.id, None);
    }

    #[test]
    fn error_codes_map_both_ways() {
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::from_code(-32601), Some(ErrorCode::MethodNotFound));
        assert_eq!(ErrorCode::from_code(-32000), None);
    }

    #[test]
    fn unknown_remote_codes_are_kept() {
        let response: Response = serde_json::from_str(
            r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"custom"},"id":2}"#,
        )
        .unwrap();
        let error = response.as_error().unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.error_code(), None);
        assert_eq!(error.to_string(), "custom (code -32000)");
    }

    #[test]
    fn params_helper_ignores_non_objects() {
        assert_eq!(params(json!({"a": 1})).len(), 1);
        assert!(params(json!([1, 2])).is_empty());
    }
}
