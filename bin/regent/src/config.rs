//! Static configuration of the sequencer.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::Args;
use regent_engine::{EngineClient, JwtSecret, RetryStrategy};
use regent_sequencer::{DEV_ADDRESS, IntervalSlotClock, Regent};
use regent_storage::{BatchStore, ChainIndex, MemDb, RangeStore};
use std::{path::PathBuf, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

const DEFAULT_DATADIR: &str = "regent-data";
const DEFAULT_L2_ENGINE_RPC: &str = "http://localhost:8551";
const DEFAULT_L2_ENGINE_TIMEOUT: u64 = 8;
const DEFAULT_SLOT_DURATION: u64 = 5;

/// Sequencer configuration.
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct RegentConfig {
    /// Directory of the chain index database.
    #[arg(long, env = "REGENT_DATADIR", default_value = DEFAULT_DATADIR)]
    pub datadir: PathBuf,
    /// Keeps the chain index in memory instead of `--datadir`. Nothing survives a restart.
    #[arg(long, env = "REGENT_IN_MEMORY", default_value_t = false)]
    pub in_memory: bool,
    /// URL of the engine API endpoint of the execution client.
    #[arg(
        long,
        visible_alias = "l2",
        env = "REGENT_L2_ENGINE_RPC",
        default_value = DEFAULT_L2_ENGINE_RPC
    )]
    pub l2_engine_rpc: Url,
    /// Path to a file containing the hex encoded JWT secret of the engine API.
    /// Requests are sent unauthenticated when unset.
    #[arg(long, visible_alias = "l2.jwt-secret", env = "REGENT_L2_ENGINE_AUTH")]
    pub l2_engine_jwt_secret: Option<PathBuf>,
    /// Per-attempt timeout of fork choice updates and payload submission, in seconds.
    #[arg(
        long,
        visible_alias = "l2.timeout",
        env = "REGENT_L2_ENGINE_TIMEOUT",
        default_value_t = DEFAULT_L2_ENGINE_TIMEOUT
    )]
    pub l2_engine_timeout: u64,
    /// Gives up on an engine call after this many attempts. Retries forever when unset.
    #[arg(
        long,
        visible_alias = "l2.max-attempts",
        env = "REGENT_L2_ENGINE_MAX_ATTEMPTS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub l2_engine_max_attempts: Option<u32>,
    /// Recipient of the fees of every sequenced block.
    #[arg(
        long,
        visible_alias = "sequencer.fee-recipient",
        env = "REGENT_FEE_RECIPIENT",
        default_value_t = DEV_ADDRESS
    )]
    pub fee_recipient: Address,
    /// Duration of a slot in seconds. One block is sequenced per slot.
    #[arg(
        long,
        visible_alias = "sequencer.slot-duration",
        env = "REGENT_SLOT_DURATION",
        default_value_t = DEFAULT_SLOT_DURATION,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub slot_duration: u64,
}

impl RegentConfig {
    /// The retry strategy of engine calls.
    pub const fn retry_strategy(&self) -> RetryStrategy {
        match self.l2_engine_max_attempts {
            Some(max_attempts) => RetryStrategy::LinearBounded { max_attempts },
            None => RetryStrategy::Linear,
        }
    }

    /// The slot duration.
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.slot_duration)
    }

    /// Builds the engine API client.
    pub fn engine_client(&self) -> Result<EngineClient> {
        let client = EngineClient::new(self.l2_engine_rpc.clone())
            .with_timeout(Duration::from_secs(self.l2_engine_timeout))
            .with_retry_strategy(self.retry_strategy());

        let Some(path) = &self.l2_engine_jwt_secret else {
            warn!(
                target: "regent",
                "No JWT secret configured, engine requests are unauthenticated"
            );
            return Ok(client);
        };
        let secret = JwtSecret::from_file(path)
            .with_context(|| format!("Failed to load JWT secret from {}", path.display()))?;
        Ok(client.with_jwt(secret))
    }

    /// Opens the chain index and runs the sequencer until it fails or ctrl-c is pressed.
    pub async fn start(self) -> Result<()> {
        let engine = self.engine_client()?;

        if self.in_memory {
            warn!(target: "regent", "Using an in-memory chain index");
            return self.sequence(engine, MemDb::new()).await;
        }

        #[cfg(feature = "rocksdb")]
        {
            let db = regent_storage::RocksDb::open(&self.datadir).with_context(|| {
                format!("Failed to open chain index at {}", self.datadir.display())
            })?;
            self.sequence(engine, db).await
        }

        #[cfg(not(feature = "rocksdb"))]
        {
            anyhow::bail!("Built without RocksDB support, pass --in-memory")
        }
    }

    /// Announces the stored head, then sequences one block per slot.
    pub async fn sequence<S>(&self, engine: EngineClient, store: S) -> Result<()>
    where
        S: RangeStore + BatchStore,
    {
        let index = ChainIndex::open(store)?;
        let mut regent = Regent::new(engine, index, self.fee_recipient)?;
        info!(
            target: "regent",
            engine = %self.l2_engine_rpc,
            fee_recipient = %self.fee_recipient,
            slot_duration = self.slot_duration,
            "Starting sequencer"
        );

        regent.bootstrap().await?;

        let cancellation = CancellationToken::new();
        let signal = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                signal.cancel();
            }
        });

        let mut clock = IntervalSlotClock::new(self.slot_duration());
        regent.run(&mut clock, cancellation).await?;
        info!(target: "regent", number = regent.head_number(), "Sequencer stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use regent_engine::test_utils::MockEngineServer;
    use regent_sequencer::SequencerError;
    use rstest::rstest;
    use std::io::Write;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        config: RegentConfig,
    }

    fn parse(args: &[&str]) -> RegentConfig {
        TestCli::try_parse_from(std::iter::once("regent").chain(args.iter().copied()))
            .unwrap()
            .config
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.datadir, PathBuf::from(DEFAULT_DATADIR));
        assert!(!config.in_memory);
        assert_eq!(config.l2_engine_rpc, Url::parse(DEFAULT_L2_ENGINE_RPC).unwrap());
        assert_eq!(config.l2_engine_jwt_secret, None);
        assert_eq!(config.l2_engine_timeout, 8);
        assert_eq!(config.fee_recipient, DEV_ADDRESS);
        assert_eq!(config.slot_duration(), Duration::from_secs(5));
        assert_eq!(config.retry_strategy(), RetryStrategy::Linear);
    }

    #[test]
    fn test_aliases() {
        let config = parse(&[
            "--l2",
            "http://engine:8551",
            "--l2.jwt-secret",
            "/tmp/jwt.hex",
            "--l2.timeout",
            "2",
            "--l2.max-attempts",
            "3",
            "--sequencer.fee-recipient",
            "0x00000000000000000000000000000000000000aa",
            "--sequencer.slot-duration",
            "2",
        ]);
        assert_eq!(config.l2_engine_rpc.as_str(), "http://engine:8551/");
        assert_eq!(config.l2_engine_jwt_secret, Some(PathBuf::from("/tmp/jwt.hex")));
        assert_eq!(config.l2_engine_timeout, 2);
        assert_eq!(config.retry_strategy(), RetryStrategy::LinearBounded { max_attempts: 3 });
        assert_eq!(config.fee_recipient, Address::with_last_byte(0xaa));
        assert_eq!(config.slot_duration, 2);
    }

    #[rstest]
    #[case(&["--slot-duration", "0"])]
    #[case(&["--l2-engine-max-attempts", "0"])]
    #[case(&["--fee-recipient", "0x1234"])]
    #[case(&["--l2-engine-rpc", "not a url"])]
    fn test_invalid_flags(#[case] args: &[&str]) {
        let result =
            TestCli::try_parse_from(std::iter::once("regent").chain(args.iter().copied()));
        assert!(result.is_err());
    }

    #[test]
    fn test_engine_client_with_jwt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0x{}", "ab".repeat(32)).unwrap();

        let mut config = parse(&["--l2-engine-timeout", "3"]);
        config.l2_engine_jwt_secret = Some(file.path().to_path_buf());

        let client = config.engine_client().unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert_eq!(client.endpoint(), &config.l2_engine_rpc);
    }

    #[test]
    fn test_engine_client_with_invalid_jwt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not hex").unwrap();

        let mut config = parse(&[]);
        config.l2_engine_jwt_secret = Some(file.path().to_path_buf());
        assert!(config.engine_client().is_err());

        config.l2_engine_jwt_secret = Some(PathBuf::from("/nonexistent/jwt.hex"));
        assert!(config.engine_client().is_err());
    }

    #[tokio::test]
    async fn test_sequence_fails_when_bootstrap_fails() {
        let server = MockEngineServer::spawn().await.unwrap();
        server.push_result(serde_json::json!({ "payloadStatus": { "status": "SYNCING" } }));

        let config = parse(&["--l2-engine-rpc", server.url().as_str(), "--in-memory"]);
        let engine = config.engine_client().unwrap().with_retry_strategy(RetryStrategy::Never);

        let err = config.sequence(engine, MemDb::new()).await.unwrap_err();
        let err = err.downcast_ref::<SequencerError>().unwrap();
        assert!(err.is_execution_client_syncing());
        assert_eq!(server.requests().len(), 1);
    }
}
