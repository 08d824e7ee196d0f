//! Contains the [`EngineClient`], an authenticated JSON-RPC client for the Engine API.

use super::{Request, Response, RetryStrategy, RpcError, TransportError};
use crate::{AuthToken, JwtSecret};
use backon::{BackoffBuilder, Retryable};
use reqwest::header::CONTENT_TYPE;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use url::Url;

/// A JSON-RPC 2.0 client that talks to an execution client over HTTP.
///
/// Every call is made under a per-attempt timeout and retried on a backoff schedule. When an
/// [`AuthToken`] is configured, each attempt carries an `Authorization: Bearer` header with a
/// freshly validated token.
#[derive(Debug)]
pub struct EngineClient {
    http: reqwest::Client,
    endpoint: Url,
    auth: Option<AuthToken>,
    retry: RetryStrategy,
    timeout: Duration,
}

impl EngineClient {
    /// Default per-attempt timeout of forkchoice updates and payload submission.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

    /// Creates an unauthenticated client for `endpoint` using the default [`RetryStrategy`].
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            auth: None,
            retry: RetryStrategy::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Authenticates every request with a token signed by `secret`.
    pub fn with_jwt(mut self, secret: JwtSecret) -> Self {
        self.set_auth_token(AuthToken::new(secret));
        self
    }

    /// Sets the token provider used for every subsequent request.
    pub fn set_auth_token(&mut self, token: AuthToken) {
        self.auth = Some(token);
    }

    /// Sets the strategy the typed bindings build their backoff schedules from.
    pub const fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// The endpoint requests are sent to.
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The configured retry strategy.
    pub const fn retry_strategy(&self) -> RetryStrategy {
        self.retry
    }

    /// Sets the per-attempt timeout of forkchoice updates and payload submission.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The per-attempt timeout of forkchoice updates and payload submission.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls `method` with positional `params`, retrying according to `backoff`.
    ///
    /// Each attempt is bounded by `timeout`. Retryable failures are retried after the next delay
    /// of the schedule until it runs out. The last error is returned on a non-retryable failure
    /// or once the schedule is exhausted.
    pub async fn call<P, R, B>(
        &self,
        method: &str,
        params: P,
        timeout: Duration,
        backoff: B,
    ) -> Result<R, RpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
        B: BackoffBuilder,
    {
        let body = serde_json::to_vec(&Request::new(method, &params))
            .map_err(|e| RpcError::from(TransportError::Marshal(e)))
            .inspect_err(|e| {
                error!(target: "engine_rpc", method, "Failed to marshal request: {}", e);
            })?;

        let mut retries = 0u32;
        (|| async {
            tokio::time::timeout(timeout, self.attempt::<R>(&body))
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(timeout).into()))
        })
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(RpcError::is_retryable)
        .notify(|e, delay| {
            retries += 1;
            warn!(
                target: "engine_rpc",
                method,
                retries,
                ?delay,
                "Engine call failed, retrying: {}",
                e
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(crate::Metrics::RPC_RETRIES_NAME, "method" => method.to_string())
                .increment(1);
        })
        .await
        .inspect_err(|e| {
            if matches!(e, RpcError::Transport(t) if !t.is_retryable()) {
                error!(target: "engine_rpc", method, "Engine call failed: {}", e);
            } else {
                debug!(target: "engine_rpc", method, "Engine call failed: {}", e);
            }
        })
    }

    /// Makes a single attempt with a pre-serialized request body.
    async fn attempt<R: DeserializeOwned>(&self, body: &[u8]) -> Result<R, RpcError> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        if let Some(auth) = &self.auth {
            builder = builder.bearer_auth(auth.token().map_err(TransportError::Auth)?);
        }
        let request = builder.build().map_err(TransportError::RequestCreation)?;

        let response = self.http.execute(request).await.map_err(TransportError::Send)?;
        let bytes = response.bytes().await.map_err(TransportError::Read)?;
        decode_response(&bytes)
    }
}

/// Decodes a response envelope. A populated `error` takes precedence over `result`.
fn decode_response<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, RpcError> {
    let unmarshal = |source| TransportError::Unmarshal {
        source,
        body: String::from_utf8_lossy(bytes).into_owned(),
    };

    let response: Response<R> = serde_json::from_slice(bytes).map_err(unmarshal)?;
    if let Some(err) = response.error {
        return Err(RpcError::Protocol(err));
    }
    match response.result {
        Some(result) => Ok(result),
        None => serde_json::from_value(serde_json::Value::Null)
            .map_err(|source| RpcError::Transport(unmarshal(source))),
    }
}
