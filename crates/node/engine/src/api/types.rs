//! Engine API result types.
//!
//! The forkchoice result is decoded leniently: a missing payload status, an unknown status string
//! or a malformed payload id all decode successfully so the caller can classify them.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Length of a well-formed payload id: `0x` followed by 8 hex encoded bytes.
pub const PAYLOAD_ID_LEN: usize = 18;

/// The status string of a [`PayloadStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusKind {
    /// The payload is valid and the forkchoice was applied.
    Valid,
    /// The payload or forkchoice is invalid.
    Invalid,
    /// The execution client is syncing.
    Syncing,
    /// The payload was accepted but not validated.
    Accepted,
    /// The block hash of the payload does not match its contents.
    InvalidBlockHash,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

/// The `payloadStatus` object of an Engine API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatus {
    /// The status.
    pub status: PayloadStatusKind,
    /// Hash of the most recent valid block in the branch, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_valid_hash: Option<B256>,
    /// Human readable reason for an invalid status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

impl PayloadStatus {
    /// A status with no hash or error.
    pub const fn new(status: PayloadStatusKind) -> Self {
        Self { status, latest_valid_hash: None, validation_error: None }
    }
}

/// The result of `engine_forkchoiceUpdatedV1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkChoiceUpdatedResult {
    /// Outcome of applying the forkchoice state. Absent only if the engine is broken.
    #[serde(default)]
    pub payload_status: Option<PayloadStatus>,
    /// Handle of the payload build job, if one was started.
    #[serde(default)]
    pub payload_id: Option<String>,
}

impl ForkChoiceUpdatedResult {
    /// Returns the payload id if it is exactly 8 hex encoded bytes with a `0x` prefix.
    pub fn valid_payload_id(&self) -> Option<&str> {
        self.payload_id.as_deref().filter(|id| {
            id.len() == PAYLOAD_ID_LEN &&
                id.strip_prefix("0x").is_some_and(|digits| hex::decode(digits).is_ok())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("VALID", PayloadStatusKind::Valid)]
    #[case("INVALID", PayloadStatusKind::Invalid)]
    #[case("SYNCING", PayloadStatusKind::Syncing)]
    #[case("ACCEPTED", PayloadStatusKind::Accepted)]
    #[case("INVALID_BLOCK_HASH", PayloadStatusKind::InvalidBlockHash)]
    #[case("SOMETHING_NEW", PayloadStatusKind::Unknown)]
    fn test_status_kind(#[case] raw: &str, #[case] kind: PayloadStatusKind) {
        let status: PayloadStatus =
            serde_json::from_value(serde_json::json!({ "status": raw })).unwrap();
        assert_eq!(status.status, kind);
    }

    #[test]
    fn test_forkchoice_result() {
        let result: ForkChoiceUpdatedResult = serde_json::from_value(serde_json::json!({
            "payloadStatus": {
                "status": "INVALID",
                "latestValidHash": null,
                "validationError": "bad block",
            },
            "payloadId": "0x0000000000000001",
        }))
        .unwrap();
        let status = result.payload_status.as_ref().unwrap();
        assert_eq!(status.status, PayloadStatusKind::Invalid);
        assert_eq!(status.validation_error.as_deref(), Some("bad block"));
        assert_eq!(result.valid_payload_id(), Some("0x0000000000000001"));
    }

    #[rstest]
    #[case(r#"{"payloadStatus":null}"#)]
    #[case(r#"{}"#)]
    fn test_missing_status(#[case] raw: &str) {
        let result: ForkChoiceUpdatedResult = serde_json::from_str(raw).unwrap();
        assert!(result.payload_status.is_none());
        assert!(result.payload_id.is_none());
    }

    #[rstest]
    #[case(None)]
    #[case(Some("0x1"))]
    #[case(Some("0x000000000000000001"))]
    #[case(Some("0xzzzzzzzzzzzzzzzz"))]
    #[case(Some("000000000000000001"))]
    #[case(Some("0X0000000000000001"))]
    fn test_malformed_payload_id(#[case] id: Option<&str>) {
        let result = ForkChoiceUpdatedResult {
            payload_status: Some(PayloadStatus::new(PayloadStatusKind::Valid)),
            payload_id: id.map(str::to_string),
        };
        assert!(result.valid_payload_id().is_none());
    }

    #[rstest]
    #[case("0x0000000000000001")]
    #[case("0x00000000000000aB")]
    fn test_valid_payload_id(#[case] id: &str) {
        let result = ForkChoiceUpdatedResult {
            payload_status: Some(PayloadStatus::new(PayloadStatusKind::Valid)),
            payload_id: Some(id.to_string()),
        };
        assert_eq!(result.valid_payload_id(), Some(id));
    }
}
