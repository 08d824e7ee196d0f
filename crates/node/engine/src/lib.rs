#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod jwt;
pub use jwt::{AuthToken, CLIENT_VERSION, Claims, JwtError, JwtSecret, TOKEN_REFRESH_AFTER};

mod rpc;
pub use rpc::{
    EngineClient, JSONRPC_VERSION, JsonRpcError, LinearBackoff, NoRetry, Request, Response,
    RetryStrategy, RpcError, TransportError,
};

mod api;
pub use api::{
    EngineApi, FORK_CHOICE_UPDATED_V1, ForkChoiceUpdatedResult, GET_PAYLOAD_TIMEOUT,
    GET_PAYLOAD_V1, NEW_PAYLOAD_V1, PAYLOAD_ID_LEN, PayloadStatus, PayloadStatusKind,
};

mod metrics;
pub use metrics::Metrics;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
