//! Contains the sequencer CLI.

use crate::config::RegentConfig;
use anyhow::Result;
use clap::Parser;
use regent_cli::{LogArgs, MetricsArgs, cli_styles};

/// The Regent rollup sequencer.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Logging arguments.
    #[command(flatten)]
    pub logs: LogArgs,
    /// Prometheus arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
    /// Sequencer configuration.
    #[command(flatten)]
    pub config: RegentConfig,
}

impl Cli {
    /// Runs the sequencer until it fails or ctrl-c is pressed.
    pub fn run(self) -> Result<()> {
        self.init_stack()?;

        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        rt.block_on(self.config.start())
    }

    /// Initializes logging and, if enabled, the Prometheus exporter.
    pub fn init_stack(&self) -> Result<()> {
        self.logs.init_tracing()?;
        self.metrics.init_metrics()?;
        regent_sequencer::Metrics::init();
        Ok(())
    }
}
