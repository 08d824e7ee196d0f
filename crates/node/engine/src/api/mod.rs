//! Typed Engine API bindings.

mod types;
pub use types::{ForkChoiceUpdatedResult, PAYLOAD_ID_LEN, PayloadStatus, PayloadStatusKind};

use crate::{EngineClient, RpcError};
use alloy_rpc_types_engine::{ExecutionPayloadV1, ForkchoiceState, PayloadAttributes};
use async_trait::async_trait;
use serde::de::IgnoredAny;
use std::time::Duration;

/// `engine_forkchoiceUpdatedV1`
pub const FORK_CHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
/// `engine_newPayloadV1`
pub const NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
/// `engine_getPayloadV1`
pub const GET_PAYLOAD_V1: &str = "engine_getPayloadV1";

/// Per-attempt timeout of payload retrieval.
pub const GET_PAYLOAD_TIMEOUT: Duration = Duration::from_secs(1);

/// The subset of the Engine API the sequencer drives.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Moves the execution client's head without starting a build.
    async fn update_fork_choice(
        &self,
        state: ForkchoiceState,
    ) -> Result<ForkChoiceUpdatedResult, RpcError>;

    /// Moves the execution client's head and starts building a payload on top of it.
    async fn update_fork_choice_and_build_block(
        &self,
        state: ForkchoiceState,
        attributes: PayloadAttributes,
    ) -> Result<ForkChoiceUpdatedResult, RpcError>;

    /// Hands a built payload to the execution client. Any non-error response is success.
    async fn submit_payload(&self, payload: ExecutionPayloadV1) -> Result<(), RpcError>;

    /// Retrieves the payload built under `payload_id`.
    async fn fetch_payload(&self, payload_id: &str) -> Result<ExecutionPayloadV1, RpcError>;
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn update_fork_choice(
        &self,
        state: ForkchoiceState,
    ) -> Result<ForkChoiceUpdatedResult, RpcError> {
        self.call(FORK_CHOICE_UPDATED_V1, (state,), self.timeout(), self.retry_strategy()).await
    }

    async fn update_fork_choice_and_build_block(
        &self,
        state: ForkchoiceState,
        attributes: PayloadAttributes,
    ) -> Result<ForkChoiceUpdatedResult, RpcError> {
        self.call(
            FORK_CHOICE_UPDATED_V1,
            (state, attributes),
            self.timeout(),
            self.retry_strategy(),
        )
        .await
    }

    async fn submit_payload(&self, payload: ExecutionPayloadV1) -> Result<(), RpcError> {
        let _: IgnoredAny =
            self.call(NEW_PAYLOAD_V1, (payload,), self.timeout(), self.retry_strategy()).await?;
        Ok(())
    }

    async fn fetch_payload(&self, payload_id: &str) -> Result<ExecutionPayloadV1, RpcError> {
        self.call(GET_PAYLOAD_V1, (payload_id,), GET_PAYLOAD_TIMEOUT, self.retry_strategy()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        JsonRpcError, RetryStrategy,
        test_utils::{MockEngineServer, MockReply, sample_payload},
    };
    use alloy_primitives::{Address, B256};

    fn client(server: &MockEngineServer) -> EngineClient {
        EngineClient::new(server.url()).with_retry_strategy(RetryStrategy::Never)
    }

    fn state() -> ForkchoiceState {
        ForkchoiceState {
            head_block_hash: B256::repeat_byte(1),
            safe_block_hash: B256::repeat_byte(2),
            finalized_block_hash: B256::repeat_byte(2),
        }
    }

    #[tokio::test]
    async fn test_update_fork_choice_sends_state_only() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_result(serde_json::json!({ "payloadStatus": { "status": "VALID" } }));

        let result = client(&server).update_fork_choice(state()).await.unwrap();
        assert_eq!(result.payload_status.unwrap().status, PayloadStatusKind::Valid);

        let request = &server.requests()[0];
        assert_eq!(request.method, FORK_CHOICE_UPDATED_V1);
        let params = request.params.as_array().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0]["headBlockHash"], serde_json::json!(B256::repeat_byte(1)));
        assert_eq!(params[0]["safeBlockHash"], params[0]["finalizedBlockHash"]);
    }

    #[tokio::test]
    async fn test_update_fork_choice_and_build_block_sends_attributes() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_result(serde_json::json!({
            "payloadStatus": { "status": "VALID" },
            "payloadId": "0x0000000000000001",
        }));

        let attributes = PayloadAttributes {
            timestamp: 0x10,
            prev_randao: B256::ZERO,
            suggested_fee_recipient: Address::repeat_byte(0xaa),
            withdrawals: None,
            parent_beacon_block_root: None,
        };
        let result = client(&server)
            .update_fork_choice_and_build_block(state(), attributes)
            .await
            .unwrap();
        assert_eq!(result.valid_payload_id(), Some("0x0000000000000001"));

        let params = server.requests()[0].params.clone();
        assert_eq!(params[1]["timestamp"], "0x10");
        assert_eq!(
            params[1]["suggestedFeeRecipient"],
            serde_json::json!(Address::repeat_byte(0xaa))
        );
    }

    #[tokio::test]
    async fn test_submit_payload_accepts_any_result() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_result(serde_json::json!({ "status": "INVALID" }));
        server.push_result(serde_json::Value::Null);

        let client = client(&server);
        client.submit_payload(sample_payload(B256::repeat_byte(3))).await.unwrap();
        client.submit_payload(sample_payload(B256::repeat_byte(4))).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].method, NEW_PAYLOAD_V1);
        assert_eq!(
            requests[0].params[0]["blockHash"],
            serde_json::json!(B256::repeat_byte(3))
        );
    }

    #[tokio::test]
    async fn test_submit_payload_propagates_error() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_reply(MockReply::error(-32602, "Invalid params"));

        let err = client(&server).submit_payload(sample_payload(B256::ZERO)).await.unwrap_err();
        assert_eq!(err.as_protocol(), Some(&JsonRpcError::new(-32602, "Invalid params")));
    }

    #[tokio::test]
    async fn test_configured_timeout_applies_to_forkchoice_updates() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_reply(MockReply::Delayed {
            delay: Duration::from_millis(500),
            body: r#"{"jsonrpc":"2.0","id":1,"result":{}}"#.to_string(),
        });

        let client = client(&server).with_timeout(Duration::from_millis(50));
        let err = client.update_fork_choice(state()).await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::Transport(crate::TransportError::Timeout(t)) if t == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_fetch_payload() {
        let server = MockEngineServer::spawn().await.unwrap();
        let payload = sample_payload(B256::repeat_byte(9));
        server.push_result(serde_json::to_value(&payload).unwrap());

        let fetched = client(&server).fetch_payload("0x0000000000000001").await.unwrap();
        assert_eq!(fetched, payload);

        let request = &server.requests()[0];
        assert_eq!(request.method, GET_PAYLOAD_V1);
        assert_eq!(request.params, serde_json::json!(["0x0000000000000001"]));
    }
}
