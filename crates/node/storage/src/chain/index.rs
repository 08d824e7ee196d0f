//! Contains the [`ChainIndex`].

use super::{BlockHashCursor, ChainIndexError, LookupKey, NotFoundError, NotFoundKind};
use crate::{
    BatchStore, RangeStore, Table, WriteBatch,
    codec::{marshal_u64, unmarshal_hash, unmarshal_u64},
};
use alloy_primitives::{B256, b256};

/// Hash of the rollup genesis block, stored at height zero.
pub const GENESIS_HASH: B256 =
    b256!("0x03cbee8fac5256aa39823eb6437acf0918f2829e1775554cdd08f9519bf3e9e1");

/// A bijective mapping between rollup block heights and block hashes.
///
/// Both directions are written in a single batch so the two tables never disagree. The genesis
/// entry is written when the index is opened, so height zero always resolves.
#[derive(Debug)]
pub struct ChainIndex<S> {
    store: S,
}

impl<S> ChainIndex<S>
where
    S: RangeStore + BatchStore,
{
    /// Opens the index on top of `store`, writing the genesis entry if it is not there yet.
    pub fn open(store: S) -> Result<Self, ChainIndexError> {
        let index = Self { store };
        match index.get_hash(0) {
            Ok(hash) => {
                tracing::debug!(target: "storage", genesis = %hash, "Found existing genesis entry");
            }
            Err(e) if e.is_not_found() => {
                index.put_with_number(GENESIS_HASH, 0)?;
                tracing::info!(
                    target: "storage",
                    genesis = %GENESIS_HASH,
                    "Initialized chain index"
                );
            }
            Err(e) => return Err(e),
        }
        Ok(index)
    }

    /// Stores `hash <-> number` in both tables as one atomic batch.
    pub fn put_with_number(&self, hash: B256, number: u64) -> Result<(), ChainIndexError> {
        let mut batch = WriteBatch::new();
        batch.put(Table::RollupBlockHashToNumber, hash.to_vec(), marshal_u64(number).to_vec());
        batch.put(Table::RollupBlockNumberToHash, marshal_u64(number).to_vec(), hash.to_vec());
        self.store.write(batch)?;
        tracing::trace!(target: "storage", %hash, number, "Stored chain index entry");
        Ok(())
    }

    /// Deletes both directions of `hash <-> number` in one batch.
    pub fn remove(&self, hash: B256, number: u64) -> Result<(), ChainIndexError> {
        let mut batch = WriteBatch::new();
        batch.delete(Table::RollupBlockHashToNumber, hash.to_vec());
        batch.delete(Table::RollupBlockNumberToHash, marshal_u64(number).to_vec());
        self.store.write(batch)?;
        Ok(())
    }

    /// Returns the height of `hash`.
    pub fn get_number(&self, hash: B256) -> Result<u64, ChainIndexError> {
        let raw = self.store.get(Table::RollupBlockHashToNumber, hash.as_slice())?.ok_or(
            NotFoundError {
                key: LookupKey::Hash(hash),
                kind: NotFoundKind::Absent,
                table: Table::RollupBlockHashToNumber,
            },
        )?;
        Ok(unmarshal_u64(&raw)?)
    }

    /// Returns the hash stored at `number`.
    pub fn get_hash(&self, number: u64) -> Result<B256, ChainIndexError> {
        let raw = self.store.get(Table::RollupBlockNumberToHash, &marshal_u64(number))?.ok_or(
            NotFoundError {
                key: LookupKey::Number(number),
                kind: NotFoundKind::Absent,
                table: Table::RollupBlockNumberToHash,
            },
        )?;
        Ok(unmarshal_hash(&raw)?)
    }

    /// Returns the highest stored entry as `(hash, number)`.
    pub fn head(&self) -> Result<(B256, u64), ChainIndexError> {
        let cursor = self.cursor()?;
        let head = cursor.head();
        cursor.release();
        Ok(head)
    }

    /// Opens a cursor over the `number -> hash` table, positioned at genesis.
    pub fn cursor(&self) -> Result<BlockHashCursor<'_>, ChainIndexError> {
        let inner = self.store.range(Table::RollupBlockNumberToHash, None, None)?;
        BlockHashCursor::new(inner)
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KvStore, MemDb};
    use rstest::rstest;

    fn hash(n: u64) -> B256 {
        B256::left_padding_from(&(n + 1000).to_be_bytes())
    }

    /// An index holding heights `0..=n`, genesis included.
    fn index_with_height(n: u64) -> ChainIndex<MemDb> {
        let index = ChainIndex::open(MemDb::new()).unwrap();
        for i in 1..=n {
            index.put_with_number(hash(i), i).unwrap();
        }
        index
    }

    #[test]
    fn test_genesis_present_on_open() {
        let index = ChainIndex::open(MemDb::new()).unwrap();
        assert_eq!(index.get_hash(0).unwrap(), GENESIS_HASH);
        assert_eq!(index.get_number(GENESIS_HASH).unwrap(), 0);
        assert_eq!(index.head().unwrap(), (GENESIS_HASH, 0));
        assert_eq!(index.cursor().unwrap().position(), 0);
    }

    #[test]
    fn test_open_keeps_existing_entries() {
        let index = index_with_height(3);
        let store = index.store;
        let index = ChainIndex::open(store).unwrap();
        assert_eq!(index.head().unwrap(), (hash(3), 3));
        assert_eq!(index.get_hash(0).unwrap(), GENESIS_HASH);
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(64)]
    fn test_bijection(#[case] n: u64) {
        let index = index_with_height(n);
        for i in 1..=n {
            assert_eq!(index.get_hash(i).unwrap(), hash(i));
            assert_eq!(index.get_number(hash(i)).unwrap(), i);
        }
        assert_eq!(index.head().unwrap(), (hash(n), n));
    }

    #[test]
    fn test_overwrite_replaces_forward_entry() {
        let index = index_with_height(2);
        let replacement = B256::repeat_byte(0x42);
        index.put_with_number(replacement, 2).unwrap();

        assert_eq!(index.get_hash(2).unwrap(), replacement);
        assert_eq!(index.get_number(replacement).unwrap(), 2);
    }

    #[test]
    fn test_lookup_absent() {
        let index = index_with_height(1);
        let err = index.get_hash(9).unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_past_head());

        let err = index.get_number(B256::repeat_byte(0x11)).unwrap_err();
        assert!(matches!(
            err,
            ChainIndexError::NotFound(NotFoundError {
                key: LookupKey::Hash(_),
                kind: NotFoundKind::Absent,
                table: Table::RollupBlockHashToNumber,
            })
        ));
    }

    #[test]
    fn test_remove_deletes_both_directions() {
        let index = index_with_height(3);
        index.remove(hash(3), 3).unwrap();
        assert!(index.get_hash(3).unwrap_err().is_not_found());
        assert!(index.get_number(hash(3)).unwrap_err().is_not_found());
        assert_eq!(index.head().unwrap(), (hash(2), 2));
    }

    #[test]
    fn test_corrupted_values() {
        let index = index_with_height(1);
        index.store().put(Table::RollupBlockNumberToHash, &marshal_u64(1), &[0u8; 31]).unwrap();
        index.store().put(Table::RollupBlockHashToNumber, hash(1).as_slice(), &[0u8; 4]).unwrap();

        assert!(index.get_hash(1).unwrap_err().is_corruption());
        assert!(index.get_number(hash(1)).unwrap_err().is_corruption());
    }
}
