//! Logging arguments and subscriber setup.

use crate::{CliError, CliResult};
use clap::{ArgAction, Args};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Logging arguments.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. Repeat to log more: `-v` for debug, `-vv` for trace.
    #[arg(long = "verbosity", short = 'v', action = ArgAction::Count, global = true)]
    pub v: u8,
}

impl LogArgs {
    /// Installs the global tracing subscriber at the selected verbosity.
    pub fn init_tracing(&self) -> CliResult<()> {
        init_tracing_subscriber(self.v, None::<EnvFilter>)
    }
}

/// Maps a `-v` count to the most verbose level that is logged.
pub const fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a `fmt` subscriber as the global default.
///
/// Without an explicit `env_filter`, directives are read from `RUST_LOG` and anything not covered
/// by them is logged up to the level selected by `verbosity`.
pub fn init_tracing_subscriber(
    verbosity: u8,
    env_filter: Option<impl Into<EnvFilter>>,
) -> CliResult<()> {
    let filter = match env_filter {
        Some(filter) => filter.into(),
        None => EnvFilter::builder()
            .with_default_directive(verbosity_level(verbosity).into())
            .from_env_lossy(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| CliError::Tracing(e.to_string()))
}
