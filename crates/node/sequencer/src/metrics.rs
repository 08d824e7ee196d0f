//! Metrics emitted by the sequencer driver.

/// Container for sequencer metric identifiers.
#[derive(Debug, Clone, Copy)]
pub struct Metrics;

impl Metrics {
    /// Gauge of the canonical head height.
    pub const HEAD_HEIGHT: &'static str = "regent_head_height";
    /// Counter of fork choice updates, labelled by `outcome`.
    pub const FORKCHOICE_UPDATES: &'static str = "regent_forkchoice_updates_total";

    /// Registers metric descriptions, including those of the engine client. Call once at
    /// startup.
    ///
    /// A no-op unless the `metrics` feature is enabled.
    pub fn init() {
        regent_engine::Metrics::init();

        #[cfg(feature = "metrics")]
        {
            metrics::describe_gauge!(Self::HEAD_HEIGHT, "Height of the canonical rollup head");
            metrics::describe_counter!(
                Self::FORKCHOICE_UPDATES,
                metrics::Unit::Count,
                "Fork choice updates issued by the sequencer, by outcome"
            );
        }
    }

    /// Records the outcome of a fork choice update.
    #[allow(unused_variables)]
    pub(crate) fn record_forkchoice_update(outcome: &'static str) {
        #[cfg(feature = "metrics")]
        metrics::counter!(Self::FORKCHOICE_UPDATES, "outcome" => outcome).increment(1);
    }

    /// Records a new head height.
    #[allow(unused_variables)]
    pub(crate) fn record_head_height(height: u64) {
        #[cfg(feature = "metrics")]
        metrics::gauge!(Self::HEAD_HEIGHT).set(height as f64);
    }
}
