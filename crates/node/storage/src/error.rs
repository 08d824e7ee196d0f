use thiserror::Error;

/// Errors raised by a key-value store backend.
///
/// Missing keys are not errors at this layer; lookups return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying RocksDB instance returned an error.
    #[error("RocksDB error: {0}")]
    RocksDb(String),

    /// A range scan was requested with bounds in the wrong order.
    #[error("Invalid range: start key sorts after end key")]
    InvalidRange,
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        Self::RocksDb(err.to_string())
    }
}
