//! Metrics emitted by the engine client.

/// Container for engine client metric identifiers.
#[derive(Debug, Clone, Copy)]
pub struct Metrics;

impl Metrics {
    /// Counter of retried engine calls, labelled by `method`.
    pub const RPC_RETRIES_NAME: &'static str = "regent_rpc_retries_total";

    /// Registers metric descriptions. Call once at startup.
    ///
    /// A no-op unless the `metrics` feature is enabled.
    pub fn init() {
        #[cfg(feature = "metrics")]
        metrics::describe_counter!(
            Self::RPC_RETRIES_NAME,
            metrics::Unit::Count,
            "Number of engine API calls that failed with a retryable error and were attempted again"
        );
    }
}
