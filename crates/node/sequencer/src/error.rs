//! Error types of the sequencer driver.

use regent_engine::{JsonRpcError, PayloadStatusKind, RpcError};
use regent_storage::ChainIndexError;

/// The execution client did not apply the requested fork choice. The head did not move.
#[derive(Debug, thiserror::Error)]
pub enum ForkchoiceUpdateError {
    /// The call failed before the execution client produced an answer.
    #[error("unknown error prevented a fork choice update: {0}")]
    Transport(#[source] RpcError),
    /// The execution client rejected the forkchoice state.
    #[error("invalid forkchoice state: {0}")]
    InvalidForkchoice(#[source] JsonRpcError),
    /// The execution client answered with any other JSON-RPC error.
    #[error("fork choice update rejected: {0}")]
    Rejected(#[source] JsonRpcError),
    /// The payload status was absent or is not one the driver understands.
    #[error(
        "invalid payload status: {}",
        .0.map_or_else(|| "missing".to_string(), |s| format!("{s:?}"))
    )]
    InvalidPayloadStatus(Option<PayloadStatusKind>),
    /// The execution client considers the new head invalid.
    #[error("invalid payload: {}", .validation_error.as_deref().unwrap_or("no validation error"))]
    InvalidPayload {
        /// The reason given by the execution client.
        validation_error: Option<String>,
    },
    /// The execution client is syncing and cannot move its head.
    #[error("execution client is syncing")]
    ExecutionClientSyncing,
}

impl ForkchoiceUpdateError {
    /// A short label for the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::InvalidForkchoice(_) => "invalid_forkchoice",
            Self::Rejected(_) => "rejected",
            Self::InvalidPayloadStatus(_) => "invalid_payload_status",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::ExecutionClientSyncing => "syncing",
        }
    }
}

/// The fork choice was applied but no new payload build was started.
#[derive(Debug, thiserror::Error)]
pub enum PayloadBuildError {
    /// The execution client rejected the payload attributes.
    #[error("invalid payload attributes: {0}")]
    InvalidTimestamp(#[source] JsonRpcError),
    /// The payload id is missing or is not 8 hex encoded bytes.
    #[error("invalid payload id: {}", .0.as_deref().unwrap_or("missing"))]
    InvalidPayloadId(Option<String>),
}

impl PayloadBuildError {
    /// A short label for the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::InvalidPayloadId(_) => "invalid_payload_id",
        }
    }
}

/// An error returned by the sequencer driver.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// The chain head did not advance.
    #[error("the fork choice could not be updated: {0}")]
    ForkchoiceNotUpdated(#[from] ForkchoiceUpdateError),
    /// The chain head advanced but no new payload is being built.
    #[error("the execution client did not start building a payload: {0}")]
    PayloadNotBuilt(#[from] PayloadBuildError),
    /// Fetching or submitting a payload failed.
    #[error("engine call failed: {0}")]
    Engine(#[source] RpcError),
    /// Reading or writing the chain index failed.
    #[error(transparent)]
    Storage(#[from] ChainIndexError),
    /// A payload was requested before any build was started.
    #[error("no payload build in flight")]
    MissingPayloadId,
    /// The system clock is set before the unix epoch.
    #[error("system clock is before the unix epoch")]
    Clock,
}

impl SequencerError {
    /// Returns `true` if the execution client did not move its head.
    pub const fn is_forkchoice_not_updated(&self) -> bool {
        matches!(self, Self::ForkchoiceNotUpdated(_))
    }

    /// Returns `true` if no new payload id was obtained.
    ///
    /// Every fork choice failure is also a build failure.
    pub const fn is_payload_not_built(&self) -> bool {
        matches!(self, Self::ForkchoiceNotUpdated(_) | Self::PayloadNotBuilt(_))
    }

    /// Returns `true` if the execution client is syncing.
    pub const fn is_execution_client_syncing(&self) -> bool {
        matches!(self, Self::ForkchoiceNotUpdated(ForkchoiceUpdateError::ExecutionClientSyncing))
    }

    /// Returns `true` if the payload attributes were rejected.
    pub const fn is_invalid_timestamp(&self) -> bool {
        matches!(self, Self::PayloadNotBuilt(PayloadBuildError::InvalidTimestamp(_)))
    }

    /// Returns `true` if the payload id was malformed.
    pub const fn is_invalid_payload_id(&self) -> bool {
        matches!(self, Self::PayloadNotBuilt(PayloadBuildError::InvalidPayloadId(_)))
    }

    /// A short label for the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ForkchoiceNotUpdated(e) => e.kind(),
            Self::PayloadNotBuilt(e) => e.kind(),
            Self::Engine(_) => "engine",
            Self::Storage(_) => "storage",
            Self::MissingPayloadId => "missing_payload_id",
            Self::Clock => "clock",
        }
    }
}
