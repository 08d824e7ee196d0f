//! Error types for the JSON-RPC transport.

use super::JsonRpcError;
use crate::JwtError;
use std::time::Duration;
use thiserror::Error;

/// A call failed before a well-formed JSON-RPC response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be serialized.
    #[error("failed to marshal request: {0}")]
    Marshal(#[source] serde_json::Error),
    /// The HTTP request could not be built.
    #[error("failed to create request: {0}")]
    RequestCreation(#[source] reqwest::Error),
    /// The request could not be sent, or the server did not answer.
    #[error("failed to send request: {0}")]
    Send(#[source] reqwest::Error),
    /// The attempt did not complete within its timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Read(#[source] reqwest::Error),
    /// The response body is not a valid response envelope for the expected result.
    #[error("failed to unmarshal response {body:?}: {source}")]
    Unmarshal {
        /// The decoding error.
        #[source]
        source: serde_json::Error,
        /// The raw response body.
        body: String,
    },
    /// The bearer token could not be produced.
    #[error("failed to sign auth token: {0}")]
    Auth(#[source] JwtError),
}

impl TransportError {
    /// Network level failures may go away on their own. Everything else is a local bug.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Send(_) | Self::Read(_) | Self::Timeout(_))
    }
}

/// The outcome of a failed JSON-RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No well-formed response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The server answered with an error object.
    #[error(transparent)]
    Protocol(#[from] JsonRpcError),
}

impl RpcError {
    /// Returns `true` if the same call may succeed when attempted again.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::Protocol(err) => err.is_retryable(),
        }
    }

    /// Returns the in-protocol error, if this is one.
    pub const fn as_protocol(&self) -> Option<&JsonRpcError> {
        match self {
            Self::Protocol(err) => Some(err),
            Self::Transport(_) => None,
        }
    }

    /// Returns the in-protocol error code, if this is an in-protocol error.
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Protocol(err) => Some(err.code),
            Self::Transport(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_bugs_are_not_retryable() {
        let marshal = serde_json::from_str::<u64>("x").unwrap_err();
        assert!(!RpcError::from(TransportError::Marshal(marshal)).is_retryable());

        let source = serde_json::from_str::<u64>("").unwrap_err();
        let unmarshal = TransportError::Unmarshal { source, body: String::new() };
        assert!(!RpcError::from(unmarshal).is_retryable());

        let auth = TransportError::Auth(JwtError::InvalidLength(32, 1));
        assert!(!RpcError::from(auth).is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert!(RpcError::from(TransportError::Timeout(Duration::from_secs(1))).is_retryable());
    }

    #[test]
    fn test_protocol_code() {
        let err = RpcError::from(JsonRpcError::new(JsonRpcError::SERVER_ERROR, "busy"));
        assert_eq!(err.code(), Some(-32000));
        assert!(err.is_retryable());
        assert!(err.as_protocol().is_some());
    }
}
