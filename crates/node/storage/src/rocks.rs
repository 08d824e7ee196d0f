//! A RocksDB-backed sorted store.

use crate::{
    BatchStore, KvStore, RangeStore, RawCursor, StoreError, Table, WriteBatch, WriteOp,
    codec::table_key,
};
use rocksdb::{DB, DBRawIterator, Options, ReadOptions};
use std::path::{Path, PathBuf};

/// A persistent store backed by a single RocksDB instance.
///
/// All logical tables share the default column family and are separated by key prefix.
pub struct RocksDb {
    db: DB,
    path: PathBuf,
}

impl core::fmt::Debug for RocksDb {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RocksDb").field("path", &self.path).finish_non_exhaustive()
    }
}

impl RocksDb {
    /// Opens the database at `path`, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        tracing::debug!(target: "storage", path = %path.display(), "Opened RocksDB");
        Ok(Self { db, path: path.to_path_buf() })
    }

    /// The directory the database lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns the smallest key that sorts after every key starting with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < u8::MAX {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

impl KvStore for RocksDb {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(table_key(table, key))?)
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.put(table_key(table, key), value)?)
    }

    fn delete(&self, table: Table, key: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.delete(table_key(table, key))?)
    }
}

impl BatchStore for RocksDb {
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut inner = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => inner.put(table_key(table, &key), value),
                WriteOp::Delete { table, key } => inner.delete(table_key(table, &key)),
            }
        }
        Ok(self.db.write(inner)?)
    }
}

impl RangeStore for RocksDb {
    fn range(
        &self,
        table: Table,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<Box<dyn RawCursor + '_>, StoreError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(StoreError::InvalidRange);
            }
        }

        let mut opts = ReadOptions::default();
        opts.set_iterate_lower_bound(table_key(table, start.unwrap_or_default()));
        let upper = match end {
            Some(end) => Some(table_key(table, end)),
            None => prefix_successor(table.prefix()),
        };
        if let Some(upper) = upper {
            opts.set_iterate_upper_bound(upper);
        }

        let iter = self.db.raw_iterator_opt(opts);
        Ok(Box::new(RocksCursor { iter, prefix_len: table.prefix().len(), table }))
    }
}

/// Cursor returned by [`RocksDb::range`]. Wraps a raw iterator, which reads from an implicit
/// snapshot taken when it was created.
struct RocksCursor<'a> {
    iter: DBRawIterator<'a>,
    prefix_len: usize,
    table: Table,
}

impl RawCursor for RocksCursor<'_> {
    fn seek_to_first(&mut self) {
        self.iter.seek_to_first();
    }

    fn seek_to_last(&mut self) {
        self.iter.seek_to_last();
    }

    fn seek(&mut self, key: &[u8]) {
        self.iter.seek(table_key(self.table, key));
    }

    fn next(&mut self) {
        if self.iter.valid() {
            self.iter.next();
        }
    }

    fn prev(&mut self) {
        if self.iter.valid() {
            self.iter.prev();
        }
    }

    fn key(&self) -> Option<&[u8]> {
        self.iter.key().and_then(|k| k.get(self.prefix_len..))
    }

    fn value(&self) -> Option<&[u8]> {
        self.iter.value()
    }

    fn status(&self) -> Result<(), StoreError> {
        Ok(self.iter.status()?)
    }
}
