#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::StoreError;

pub mod codec;
pub use codec::{CorruptionError, Table};

pub mod traits;
pub use traits::{BatchStore, KvStore, RangeStore, RawCursor, WriteBatch, WriteOp};

mod mem;
pub use mem::MemDb;

#[cfg(feature = "rocksdb")]
mod rocks;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksDb;

mod chain;
pub use chain::{
    BlockHashCursor, ChainIndex, ChainIndexError, GENESIS_HASH, LookupKey, NotFoundError,
    NotFoundKind,
};
