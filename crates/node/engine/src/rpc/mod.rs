//! JSON-RPC transport for the Engine API.

mod envelope;
pub use envelope::{JSONRPC_VERSION, JsonRpcError, Request, Response};

mod error;
pub use error::{RpcError, TransportError};

mod retry;
pub use retry::{LinearBackoff, NoRetry, RetryStrategy};

mod client;
pub use client::EngineClient;
