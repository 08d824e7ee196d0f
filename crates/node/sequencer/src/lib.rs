#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod error;
pub use error::{ForkchoiceUpdateError, PayloadBuildError, SequencerError};

mod clock;
pub use clock::{IntervalSlotClock, SlotClock};

mod regent;
pub use regent::{DEV_ADDRESS, Regent};

mod metrics;
pub use metrics::Metrics;
