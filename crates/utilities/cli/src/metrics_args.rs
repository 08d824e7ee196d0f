//! Prometheus metrics arguments.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

const DEFAULT_METRICS_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_METRICS_PORT: u16 = 9090;

/// Configuration of the Prometheus exporter.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics when set.
    #[arg(
        long = "metrics.enabled",
        global = true,
        default_value_t = false,
        env = "REGENT_METRICS_ENABLED"
    )]
    pub enabled: bool,
    /// Interface the metrics server listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value_t = DEFAULT_METRICS_ADDR,
        env = "REGENT_METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// Port the metrics server listens on. `0` picks a free port.
    #[arg(
        long = "metrics.port",
        global = true,
        default_value_t = DEFAULT_METRICS_PORT,
        env = "REGENT_METRICS_PORT"
    )]
    pub port: u16,
}

impl MetricsArgs {
    /// Starts the Prometheus server if metrics are enabled.
    pub fn init_metrics(&self) -> CliResult<()> {
        if self.enabled {
            init_prometheus_server(self.addr, self.port)?;
        }
        Ok(())
    }
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: DEFAULT_METRICS_ADDR, port: DEFAULT_METRICS_PORT }
    }
}
