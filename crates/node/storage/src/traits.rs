//! Capability traits for the sorted key-value store backing the chain index.
//!
//! The chain index only depends on these traits, so it runs unchanged on top of [`MemDb`] in
//! tests and on top of RocksDB in production.
//!
//! [`MemDb`]: crate::MemDb

use crate::{StoreError, Table};

/// Byte read, write and delete against a logical table.
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key` in `table`, or `None` if there is none.
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `value` under `key` in `table`, overwriting any previous value.
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Deletes `key` from `table`. Deleting an absent key is not an error.
    fn delete(&self, table: Table, key: &[u8]) -> Result<(), StoreError>;
}

/// A single operation of a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store a value.
    Put {
        /// Target table.
        table: Table,
        /// Table-local key.
        key: Vec<u8>,
        /// Value to store.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Target table.
        table: Table,
        /// Table-local key.
        key: Vec<u8>,
    },
}

/// An ordered list of writes applied atomically by a [`BatchStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queues a put.
    pub fn put(&mut self, table: Table, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Put { table, key: key.into(), value: value.into() });
    }

    /// Queues a delete.
    pub fn delete(&mut self, table: Table, key: impl Into<Vec<u8>>) {
        self.ops.push(WriteOp::Delete { table, key: key.into() });
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if no operation is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the batch, yielding its operations in insertion order.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// A store that can apply several writes as one atomic unit.
pub trait BatchStore: KvStore {
    /// Applies every operation of `batch`, or none of them.
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// A store that supports ordered scans over a key range of one table.
pub trait RangeStore: KvStore {
    /// Opens a cursor over `table` restricted to `[start, end)` in table-local key space.
    ///
    /// `None` bounds are open. The cursor is unpositioned until one of its seek methods is
    /// called.
    fn range(
        &self,
        table: Table,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn RawCursor + '_>, StoreError>;
}

/// A positioned, bidirectional scan over one table.
///
/// Keys returned by [`RawCursor::key`] have the table prefix removed. Once the cursor moves off
/// either end of its range, [`RawCursor::key`] and [`RawCursor::value`] return `None` until it is
/// re-seeked.
pub trait RawCursor {
    /// Moves to the first key of the range.
    fn seek_to_first(&mut self);

    /// Moves to the last key of the range.
    fn seek_to_last(&mut self);

    /// Moves to the first key that is greater than or equal to `key`.
    fn seek(&mut self, key: &[u8]);

    /// Moves one key forward.
    fn next(&mut self);

    /// Moves one key backward.
    fn prev(&mut self);

    /// The key under the cursor.
    fn key(&self) -> Option<&[u8]>;

    /// The value under the cursor.
    fn value(&self) -> Option<&[u8]>;

    /// Reports any error hit by the underlying scan.
    fn status(&self) -> Result<(), StoreError>;
}
