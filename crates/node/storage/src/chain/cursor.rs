//! Contains the [`BlockHashCursor`].

use super::{ChainIndexError, GENESIS_HASH, LookupKey, NotFoundError, NotFoundKind};
use crate::{
    RawCursor, Table,
    codec::{marshal_u64, unmarshal_hash, unmarshal_u64},
};
use alloy_primitives::B256;

/// A bidirectional cursor over the `number -> hash` table.
///
/// The position ranges over `[0, head + 1]`, where `head + 1` is the past-the-end position.
/// Movement past either end fails with [`ChainIndexError::Exhausted`] and leaves the position
/// unchanged. The head is fixed when the cursor is opened.
///
/// The cursor must be handed back with [`BlockHashCursor::release`] once the caller is done.
pub struct BlockHashCursor<'a> {
    inner: Box<dyn RawCursor + 'a>,
    position: u64,
    head: u64,
    head_hash: B256,
    genesis: B256,
}

impl core::fmt::Debug for BlockHashCursor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockHashCursor")
            .field("position", &self.position)
            .field("head", &self.head)
            .field("head_hash", &self.head_hash)
            .finish_non_exhaustive()
    }
}

impl<'a> BlockHashCursor<'a> {
    pub(crate) fn new(mut inner: Box<dyn RawCursor + 'a>) -> Result<Self, ChainIndexError> {
        inner.seek_to_last();
        inner.status()?;
        let (Some(key), Some(value)) = (inner.key(), inner.value()) else {
            return Err(NotFoundError {
                key: LookupKey::Number(0),
                kind: NotFoundKind::Missing { found: None },
                table: Table::RollupBlockNumberToHash,
            }
            .into());
        };
        let head = unmarshal_u64(key)?;
        let head_hash = unmarshal_hash(value)?;

        let mut cursor = Self { inner, position: 0, head, head_hash, genesis: GENESIS_HASH };
        cursor.genesis = cursor.read_at(0)?;
        Ok(cursor)
    }

    /// Reads the hash at `number`, re-seeking the scan only if it is not already there.
    fn read_at(&mut self, number: u64) -> Result<B256, ChainIndexError> {
        let target = marshal_u64(number);
        if self.inner.key() != Some(target.as_slice()) {
            self.inner.seek(&target);
        }
        self.inner.status()?;

        match (self.inner.key(), self.inner.value()) {
            (Some(key), Some(value)) if key == target.as_slice() => Ok(unmarshal_hash(value)?),
            (key, _) => {
                let found = key.map(unmarshal_u64).transpose()?;
                Err(NotFoundError {
                    key: LookupKey::Number(number),
                    kind: NotFoundKind::Missing { found },
                    table: Table::RollupBlockNumberToHash,
                }
                .into())
            }
        }
    }

    /// Returns the hash at the current position and advances by one.
    pub fn next(&mut self) -> Result<B256, ChainIndexError> {
        if self.position > self.head {
            return Err(ChainIndexError::Exhausted);
        }
        let hash = self.read_at(self.position)?;
        self.position += 1;
        self.inner.next();
        Ok(hash)
    }

    /// Moves back by one and returns the hash now under the cursor.
    pub fn prev(&mut self) -> Result<B256, ChainIndexError> {
        if self.position == 0 {
            return Err(ChainIndexError::Exhausted);
        }
        let hash = self.read_at(self.position - 1)?;
        self.position -= 1;
        Ok(hash)
    }

    /// Returns the hash at the current position without moving.
    pub fn peek(&mut self) -> Result<B256, ChainIndexError> {
        if self.position > self.head {
            return Err(ChainIndexError::Exhausted);
        }
        self.read_at(self.position)
    }

    /// Moves directly to `number` and returns its hash.
    pub fn seek(&mut self, number: u64) -> Result<B256, ChainIndexError> {
        if number > self.head {
            return Err(NotFoundError {
                key: LookupKey::Number(number),
                kind: NotFoundKind::PastHead { head: self.head },
                table: Table::RollupBlockNumberToHash,
            }
            .into());
        }
        let hash = self.read_at(number)?;
        self.position = number;
        Ok(hash)
    }

    /// The current position. Equals `head + 1` once the cursor has moved past the head.
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// The head entry as `(hash, number)`.
    pub const fn head(&self) -> (B256, u64) {
        (self.head_hash, self.head)
    }

    /// The hash at height zero.
    pub const fn genesis(&self) -> B256 {
        self.genesis
    }

    /// The highest stored height.
    pub const fn max_height(&self) -> u64 {
        self.head
    }

    /// Releases the underlying scan.
    pub fn release(self) {
        drop(self.inner);
    }
}
