//! JSON-RPC 2.0 request and response envelopes.

use serde::{Deserialize, Serialize};

/// The JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request with positional parameters `P`.
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a, P> {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// The method to invoke.
    pub method: &'a str,
    /// Positional parameters, serialized as a JSON array.
    pub params: P,
    /// Request id. Calls are never pipelined, so a constant is enough.
    pub id: u64,
}

impl<'a, P> Request<'a, P> {
    /// Creates a request for `method`.
    pub const fn new(method: &'a str, params: P) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, method, params, id: 1 }
    }
}

/// A JSON-RPC response carrying a result of type `R`.
///
/// `jsonrpc` and `id` are accepted but not checked, since some engines omit them.
#[derive(Debug, Clone, Deserialize)]
pub struct Response<R> {
    /// Protocol version, if sent.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Echoed request id, if sent.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// The result on success.
    pub result: Option<R>,
    /// The error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// An in-protocol error returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("jsonrpc error, code: {code}, message: {message}")]
pub struct JsonRpcError {
    /// The error code.
    pub code: i64,
    /// A short description of the error.
    pub message: String,
}

impl JsonRpcError {
    /// Generic internal error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic server error.
    pub const SERVER_ERROR: i64 = -32000;
    /// The forkchoice state is invalid or inconsistent.
    pub const INVALID_FORKCHOICE_STATE: i64 = -38002;
    /// The payload attributes are invalid or inconsistent.
    pub const INVALID_PAYLOAD_ATTRIBUTES: i64 = -38003;

    /// Creates an error with `code` and `message`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Only the two generic codes may succeed on a retry. Every engine specific code is final.
    pub const fn is_retryable(&self) -> bool {
        matches!(self.code, Self::INTERNAL_ERROR | Self::SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_request_shape() {
        let request = Request::new("engine_getPayloadV1", ("0x0000000000000001",));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "engine_getPayloadV1",
                "params": ["0x0000000000000001"],
                "id": 1,
            })
        );
    }

    #[test]
    fn test_response_without_envelope_fields() {
        let response: Response<u64> = serde_json::from_str(r#"{"result":7}"#).unwrap();
        assert_eq!(response.result, Some(7));
        assert!(response.error.is_none());
        assert!(response.jsonrpc.is_none());
    }

    #[test]
    fn test_response_with_error() {
        let raw = r#"{"jsonrpc":"2.0","id":1,
            "error":{"code":-38003,"message":"Invalid payload attributes"}}"#;
        let response: Response<u64> = serde_json::from_str(raw).unwrap();
        assert!(response.result.is_none());
        assert_eq!(
            response.error,
            Some(JsonRpcError::new(-38003, "Invalid payload attributes"))
        );
    }

    #[rstest]
    #[case(JsonRpcError::INTERNAL_ERROR, true)]
    #[case(JsonRpcError::SERVER_ERROR, true)]
    #[case(JsonRpcError::INVALID_FORKCHOICE_STATE, false)]
    #[case(JsonRpcError::INVALID_PAYLOAD_ATTRIBUTES, false)]
    #[case(-32601, false)]
    fn test_protocol_error_retryable(#[case] code: i64, #[case] retryable: bool) {
        assert_eq!(JsonRpcError::new(code, "").is_retryable(), retryable);
    }
}
