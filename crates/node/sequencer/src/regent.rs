//! Contains the [`Regent`] sequencer driver.

use crate::{ForkchoiceUpdateError, Metrics, PayloadBuildError, SequencerError, SlotClock};
use alloy_primitives::{Address, B256, address};
use alloy_rpc_types_engine::{ForkchoiceState, PayloadAttributes};
use regent_engine::{EngineApi, ForkChoiceUpdatedResult, JsonRpcError, PayloadStatusKind, RpcError};
use regent_storage::{BatchStore, ChainIndex, RangeStore};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Fee recipient used for development chains.
pub const DEV_ADDRESS: Address = address!("0x013068165Fe8257f960C6831745927f924b2dd0d");

/// A fork choice update the execution client applied.
#[derive(Debug)]
enum Applied {
    /// The head moved and a build may have started.
    Building(ForkChoiceUpdatedResult),
    /// The head moved but the payload attributes were rejected.
    AttributesRejected(JsonRpcError),
}

/// Classifies the outcome of a fork choice update with payload attributes.
fn classify(
    outcome: Result<ForkChoiceUpdatedResult, RpcError>,
) -> Result<Applied, ForkchoiceUpdateError> {
    let result = match outcome {
        Ok(result) => result,
        Err(RpcError::Protocol(err)) => {
            return match err.code {
                JsonRpcError::INVALID_FORKCHOICE_STATE => {
                    Err(ForkchoiceUpdateError::InvalidForkchoice(err))
                }
                JsonRpcError::INVALID_PAYLOAD_ATTRIBUTES => Ok(Applied::AttributesRejected(err)),
                _ => Err(ForkchoiceUpdateError::Rejected(err)),
            };
        }
        Err(err) => return Err(ForkchoiceUpdateError::Transport(err)),
    };

    match result.payload_status.as_ref().map(|status| status.status) {
        None => Err(ForkchoiceUpdateError::InvalidPayloadStatus(None)),
        Some(PayloadStatusKind::Valid) => Ok(Applied::Building(result)),
        Some(PayloadStatusKind::Invalid) => Err(ForkchoiceUpdateError::InvalidPayload {
            validation_error: result.payload_status.and_then(|status| status.validation_error),
        }),
        Some(PayloadStatusKind::Syncing) => Err(ForkchoiceUpdateError::ExecutionClientSyncing),
        Some(other) => Err(ForkchoiceUpdateError::InvalidPayloadStatus(Some(other))),
    }
}

/// Seconds since the unix epoch.
fn unix_timestamp() -> Result<u64, SequencerError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| SequencerError::Clock)
}

/// The sequencer driver.
///
/// Owns the canonical head and the id of the payload the execution client is building on top of
/// it. Every accepted head is written to the [`ChainIndex`] under the next height.
#[derive(Debug)]
pub struct Regent<E, S> {
    /// The execution client.
    engine: E,
    /// Persistent height to hash mapping.
    index: ChainIndex<S>,
    /// The canonical head.
    current_head: B256,
    /// Height of the canonical head.
    head_number: u64,
    /// The id of the payload being built on top of the head, if any.
    next_payload_id: Option<String>,
    /// Fee recipient of the blocks built by the main loop.
    beneficiary: Address,
}

impl<E, S> Regent<E, S>
where
    E: EngineApi,
    S: RangeStore + BatchStore,
{
    /// Creates a driver that resumes from the highest entry of `index`.
    pub fn new(
        engine: E,
        index: ChainIndex<S>,
        beneficiary: Address,
    ) -> Result<Self, SequencerError> {
        let (current_head, head_number) = index.head()?;
        info!(target: "sequencer", number = head_number, hash = %current_head, "Loaded chain head");
        Metrics::record_head_height(head_number);

        Ok(Self { engine, index, current_head, head_number, next_payload_id: None, beneficiary })
    }

    /// The canonical head.
    pub const fn current_head(&self) -> B256 {
        self.current_head
    }

    /// Height of the canonical head.
    pub const fn head_number(&self) -> u64 {
        self.head_number
    }

    /// The id of the payload being built, if any.
    pub fn next_payload_id(&self) -> Option<&str> {
        self.next_payload_id.as_deref()
    }

    /// Fee recipient of the blocks built by the main loop.
    pub const fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    /// The chain index.
    pub const fn index(&self) -> &ChainIndex<S> {
        &self.index
    }

    /// The execution client.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Moves the execution client's head to `new_head` and asks it to build the next block on
    /// top, paying fees to `fee_recipient`.
    ///
    /// The head advances unless the error is
    /// [`ForkchoiceNotUpdated`](SequencerError::ForkchoiceNotUpdated) or
    /// [`Storage`](SequencerError::Storage). Re-announcing the current head does not change its
    /// height.
    pub async fn extend_chain_and_start_builder(
        &mut self,
        new_head: B256,
        fee_recipient: Address,
    ) -> Result<(), SequencerError> {
        let state = ForkchoiceState {
            head_block_hash: new_head,
            safe_block_hash: self.current_head,
            finalized_block_hash: self.current_head,
        };
        let attributes = PayloadAttributes {
            timestamp: unix_timestamp()?,
            prev_randao: B256::ZERO,
            suggested_fee_recipient: fee_recipient,
            withdrawals: None,
            parent_beacon_block_root: None,
        };

        debug!(
            target: "sequencer",
            head = %new_head,
            parent = %self.current_head,
            timestamp = attributes.timestamp,
            "Updating fork choice"
        );
        let outcome = self.engine.update_fork_choice_and_build_block(state, attributes).await;

        let applied = match classify(outcome) {
            Ok(applied) => applied,
            Err(e) => {
                error!(target: "sequencer", head = %new_head, "Fork choice not updated: {e}");
                Metrics::record_forkchoice_update(e.kind());
                return Err(e.into());
            }
        };

        // Any earlier build is stale once the head moved.
        self.next_payload_id = None;
        self.advance_head(new_head)?;

        let result = match applied {
            Applied::Building(result) => result,
            Applied::AttributesRejected(err) => {
                let e = PayloadBuildError::InvalidTimestamp(err);
                error!(target: "sequencer", head = %new_head, "Payload build not started: {e}");
                Metrics::record_forkchoice_update(e.kind());
                return Err(e.into());
            }
        };

        let Some(payload_id) = result.valid_payload_id().map(str::to_string) else {
            let e = PayloadBuildError::InvalidPayloadId(result.payload_id);
            error!(target: "sequencer", head = %new_head, "Payload build not started: {e}");
            Metrics::record_forkchoice_update(e.kind());
            return Err(e.into());
        };

        debug!(
            target: "sequencer",
            head = %new_head,
            payload_id = %payload_id,
            "Started payload build"
        );
        Metrics::record_forkchoice_update("valid");
        self.next_payload_id = Some(payload_id);
        Ok(())
    }

    /// Re-announces the current head and starts building the first block on top of it.
    pub async fn bootstrap(&mut self) -> Result<(), SequencerError> {
        info!(
            target: "sequencer",
            number = self.head_number,
            hash = %self.current_head,
            "Announcing chain head to the execution client"
        );
        self.extend_chain_and_start_builder(self.current_head, self.beneficiary).await
    }

    /// Runs one iteration of the main loop: fetches the payload being built, submits it and
    /// extends the chain with it. Returns the hash of the new head.
    pub async fn step(&mut self) -> Result<B256, SequencerError> {
        let payload_id = self.next_payload_id.clone().ok_or(SequencerError::MissingPayloadId)?;

        let payload =
            self.engine.fetch_payload(&payload_id).await.map_err(SequencerError::Engine)?;
        let block_hash = payload.block_hash;
        debug!(
            target: "sequencer",
            payload_id = %payload_id,
            hash = %block_hash,
            transactions = payload.transactions.len(),
            "Fetched payload"
        );

        self.engine.submit_payload(payload).await.map_err(SequencerError::Engine)?;
        self.extend_chain_and_start_builder(block_hash, self.beneficiary).await?;
        Ok(block_hash)
    }

    /// Runs [`Self::step`] at the start of every slot until a step fails or `cancellation` is
    /// triggered.
    ///
    /// Every error is fatal. Returns `Ok(())` only when cancelled.
    pub async fn run<C: SlotClock>(
        &mut self,
        clock: &mut C,
        cancellation: CancellationToken,
    ) -> Result<(), SequencerError> {
        info!(target: "sequencer", "Starting sequencer loop");
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    info!(target: "sequencer", "Received shutdown signal. Exiting sequencer loop.");
                    return Ok(());
                }
                _ = clock.wait_for_next_slot() => {}
            }

            if let Err(e) = self.step().await {
                error!(target: "sequencer", kind = e.kind(), "Sequencer step failed: {e}");
                return Err(e);
            }
        }
    }

    /// Persists `new_head` under the next height, then moves the head to it. The head is left
    /// unchanged if the write fails.
    fn advance_head(&mut self, new_head: B256) -> Result<(), SequencerError> {
        if new_head == self.current_head {
            return Ok(());
        }

        let number = self.head_number + 1;
        self.index.put_with_number(new_head, number)?;
        self.current_head = new_head;
        self.head_number = number;

        info!(target: "sequencer", number, hash = %new_head, "Advanced chain head");
        Metrics::record_head_height(number);
        Ok(())
    }
}
