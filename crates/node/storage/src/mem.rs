//! An in-memory sorted store.

use crate::{
    BatchStore, KvStore, RangeStore, RawCursor, StoreError, Table, WriteBatch, WriteOp,
    codec::{strip_table_prefix, table_key},
};
use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{PoisonError, RwLock},
};

/// A [`BTreeMap`]-backed store, sorted by full key exactly like the on-disk store.
///
/// Range cursors operate on a snapshot taken when the cursor is opened, so writes made through
/// the store afterwards are not observed by an open cursor.
#[derive(Debug, Default)]
pub struct MemDb {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemDb {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys across all tables.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemDb {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(&table_key(table, key)).cloned())
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(table_key(table, key), value.to_vec());
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(&table_key(table, key));
        Ok(())
    }
}

impl BatchStore for MemDb {
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { table, key, value } => {
                    map.insert(table_key(table, &key), value);
                }
                WriteOp::Delete { table, key } => {
                    map.remove(&table_key(table, &key));
                }
            }
        }
        Ok(())
    }
}

impl RangeStore for MemDb {
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

        let lower = table_key(table, start.unwrap_or_default());
        let upper = match end {
            Some(end) => Bound::Excluded(table_key(table, end)),
            None => Bound::Unbounded,
        };

        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entries = map
            .range((Bound::Included(lower), upper))
            .map_while(|(k, v)| {
                strip_table_prefix(table, k).map(|local| (local.to_vec(), v.clone()))
            })
            .collect();

        Ok(Box::new(MemCursor { entries, pos: None }))
    }
}

/// Snapshot cursor returned by [`MemDb::range`].
#[derive(Debug)]
struct MemCursor {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
}

impl RawCursor for MemCursor {
    fn seek_to_first(&mut self) {
        self.pos = (!self.entries.is_empty()).then_some(0);
    }

    fn seek_to_last(&mut self) {
        self.pos = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, key: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() < key);
        self.pos = (idx < self.entries.len()).then_some(idx);
    }

    fn next(&mut self) {
        self.pos = self.pos.map(|p| p + 1).filter(|p| *p < self.entries.len());
    }

    fn prev(&mut self) {
        self.pos = self.pos.and_then(|p| p.checked_sub(1));
    }

    fn key(&self) -> Option<&[u8]> {
        self.pos.map(|p| self.entries[p].0.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.pos.map(|p| self.entries[p].1.as_slice())
    }

    fn status(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::marshal_u64;

    #[test]
    fn test_tables_are_isolated() {
        let db = MemDb::new();
        db.put(Table::RollupBlockHashToNumber, b"k", b"a").unwrap();
        db.put(Table::RollupBlockNumberToHash, b"k", b"b").unwrap();

        assert_eq!(db.get(Table::RollupBlockHashToNumber, b"k").unwrap(), Some(b"a".to_vec()));
        assert_eq!(db.get(Table::RollupBlockNumberToHash, b"k").unwrap(), Some(b"b".to_vec()));

        db.delete(Table::RollupBlockHashToNumber, b"k").unwrap();
        assert_eq!(db.get(Table::RollupBlockHashToNumber, b"k").unwrap(), None);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let db = MemDb::new();
        let mut batch = WriteBatch::new();
        batch.put(Table::RollupBlockNumberToHash, b"x".to_vec(), b"1".to_vec());
        batch.delete(Table::RollupBlockNumberToHash, b"x".to_vec());
        batch.put(Table::RollupBlockNumberToHash, b"y".to_vec(), b"2".to_vec());
        assert_eq!(batch.len(), 3);
        db.write(batch).unwrap();

        assert_eq!(db.get(Table::RollupBlockNumberToHash, b"x").unwrap(), None);
        assert_eq!(db.get(Table::RollupBlockNumberToHash, b"y").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_range_stays_within_table() {
        let db = MemDb::new();
        for n in 0..5u64 {
            db.put(Table::RollupBlockNumberToHash, &marshal_u64(n), &[n as u8]).unwrap();
        }
        db.put(Table::RollupBlockHashToNumber, &[0xff; 32], &marshal_u64(9)).unwrap();

        let mut cursor = db.range(Table::RollupBlockNumberToHash, None, None).unwrap();
        cursor.seek_to_first();
        let mut seen = Vec::new();
        while let Some(value) = cursor.value() {
            seen.push(value[0]);
            cursor.next();
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        cursor.seek_to_last();
        assert_eq!(cursor.key(), Some(marshal_u64(4).as_slice()));
        cursor.prev();
        assert_eq!(cursor.key(), Some(marshal_u64(3).as_slice()));
    }

    #[test]
    fn test_range_bounds() {
        let db = MemDb::new();
        for n in 0..10u64 {
            db.put(Table::RollupBlockNumberToHash, &marshal_u64(n), &[n as u8]).unwrap();
        }

        let mut cursor = db
            .range(
                Table::RollupBlockNumberToHash,
                Some(&marshal_u64(3)),
                Some(&marshal_u64(6)),
            )
            .unwrap();
        cursor.seek_to_first();
        assert_eq!(cursor.value(), Some([3u8].as_slice()));
        cursor.seek_to_last();
        assert_eq!(cursor.value(), Some([5u8].as_slice()));
        cursor.next();
        assert_eq!(cursor.key(), None);

        cursor.seek(&marshal_u64(4));
        assert_eq!(cursor.value(), Some([4u8].as_slice()));

        assert!(matches!(
            db.range(Table::RollupBlockNumberToHash, Some(&marshal_u64(6)), Some(&marshal_u64(3))),
            Err(StoreError::InvalidRange)
        ));
    }

    #[test]
    fn test_cursor_is_snapshot() {
        let db = MemDb::new();
        db.put(Table::RollupBlockNumberToHash, &marshal_u64(0), b"a").unwrap();
        let mut cursor = db.range(Table::RollupBlockNumberToHash, None, None).unwrap();
        db.put(Table::RollupBlockNumberToHash, &marshal_u64(1), b"b").unwrap();

        cursor.seek_to_last();
        assert_eq!(cursor.key(), Some(marshal_u64(0).as_slice()));
    }
}
