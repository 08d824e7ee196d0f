//! A scripted Engine API server for tests.

use crate::JsonRpcError;
use alloy_primitives::{Address, B256, Bloom, Bytes, U256};
use alloy_rpc_types_engine::ExecutionPayloadV1;
use std::{
    collections::VecDeque,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use url::Url;

/// How the server answers a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Answer `200 OK` with this body.
    Body(String),
    /// Close the connection without answering.
    Drop,
    /// Announce a longer body than is sent, then close the connection.
    Truncated(String),
    /// Wait, then answer with this body.
    Delayed {
        /// Time to wait before answering.
        delay: Duration,
        /// The body.
        body: String,
    },
}

impl MockReply {
    /// A raw body.
    pub fn body(body: impl Into<String>) -> Self {
        Self::Body(body.into())
    }

    /// A successful response envelope around `result`.
    pub fn result(result: serde_json::Value) -> Self {
        Self::Body(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
    }

    /// An error response envelope.
    pub fn error(code: i64, message: &str) -> Self {
        let error = JsonRpcError::new(code, message);
        Self::Body(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "error": error }).to_string())
    }
}

/// A request received by the [`MockEngineServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The JSON-RPC method.
    pub method: String,
    /// The JSON-RPC params.
    pub params: serde_json::Value,
    /// The `Authorization` header, if any.
    pub authorization: Option<String>,
    /// The raw body.
    pub body: String,
}

#[derive(Debug, Default)]
struct ServerState {
    replies: VecDeque<MockReply>,
    fallback: Option<MockReply>,
    requests: Vec<RecordedRequest>,
}

/// A minimal HTTP/1.1 server that answers every request with the next scripted [`MockReply`].
///
/// When the script runs out, the fallback reply is used. Without a fallback the connection is
/// dropped. Every connection serves a single request.
///
/// HTTP is spoken directly on the [`TcpStream`] because [`MockReply::Drop`] and
/// [`MockReply::Truncated`] close the connection mid-exchange or announce a `Content-Length` that
/// is never delivered, which an HTTP server crate does not allow. Only the `Content-Length` and
/// `Authorization` headers of a request are inspected.
#[derive(Debug)]
pub struct MockEngineServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    handle: JoinHandle<()>,
}

impl MockEngineServer {
    /// Binds to an ephemeral local port and starts serving.
    pub async fn spawn() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ServerState::default()));

        let serve_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&serve_state)));
            }
        });

        Ok(Self { addr, state, handle })
    }

    /// The server URL.
    pub fn url(&self) -> Url {
        let raw = format!("http://{}", self.addr);
        Url::parse(&raw).unwrap_or_else(|e| panic!("invalid mock server url {raw}: {e}"))
    }

    /// Queues a reply.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    /// Queues a successful response with `result`.
    pub fn push_result(&self, result: serde_json::Value) {
        self.push_reply(MockReply::result(result));
    }

    /// Sets the reply used once the queue is empty.
    pub fn set_fallback(&self, reply: MockReply) {
        self.lock().fallback = Some(reply);
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MockEngineServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reads one request, records it and writes the scripted reply.
async fn serve(mut stream: TcpStream, state: Arc<Mutex<ServerState>>) {
    let Some((authorization, body)) = read_request(&mut stream).await else {
        return;
    };

    let reply = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        state.requests.push(RecordedRequest {
            method: parsed["method"].as_str().unwrap_or_default().to_string(),
            params: parsed["params"].clone(),
            authorization,
            body,
        });
        state.replies.pop_front().or_else(|| state.fallback.clone())
    };

    match reply {
        None | Some(MockReply::Drop) => {}
        Some(MockReply::Body(body)) => write_response(&mut stream, &body, body.len()).await,
        Some(MockReply::Truncated(body)) => {
            write_response(&mut stream, &body, body.len() + 64).await
        }
        Some(MockReply::Delayed { delay, body }) => {
            tokio::time::sleep(delay).await;
            write_response(&mut stream, &body, body.len()).await;
        }
    }
    let _ = stream.shutdown().await;
}

/// Reads the head and body of a request. Returns the `Authorization` header and the body.
///
/// Expects a single `Content-Length` delimited body. Chunked requests are not supported.
async fn read_request(stream: &mut TcpStream) -> Option<(Option<String>, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut content_length = 0usize;
    let mut authorization = None;
    for line in head.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().ok()?;
        } else if name.eq_ignore_ascii_case("authorization") {
            authorization = Some(value.to_string());
        }
    }

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[head_end..head_end + content_length]).into_owned();
    Some((authorization, body))
}

async fn write_response(stream: &mut TcpStream, body: &str, announced_len: usize) {
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
         Content-Length: {announced_len}\r\nConnection: close\r\n\r\n"
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(body.as_bytes()).await;
    let _ = stream.flush().await;
}

/// An execution payload with the given block hash and otherwise empty fields.
pub fn sample_payload(block_hash: B256) -> ExecutionPayloadV1 {
    ExecutionPayloadV1 {
        parent_hash: B256::ZERO,
        fee_recipient: Address::ZERO,
        state_root: B256::ZERO,
        receipts_root: B256::ZERO,
        logs_bloom: Bloom::ZERO,
        prev_randao: B256::ZERO,
        block_number: 1,
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp: 1,
        extra_data: Bytes::new(),
        base_fee_per_gas: U256::from(7),
        block_hash,
        transactions: vec![],
    }
}
