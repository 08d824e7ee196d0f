//! Key and value encoding for the flat, table-less keyspace.
//!
//! Every logical table is a key-prefix partition of one sorted keyspace: the stored key is the
//! table name followed by the table-local key. Block numbers are encoded big-endian so that the
//! byte-lexicographic order of the keys equals the numeric order of the heights.

use alloy_primitives::B256;
use thiserror::Error;

/// Length of a serialized `u64`.
pub const SERIALIZED_U64_LEN: usize = 8;

/// Length of a serialized block hash.
pub const SERIALIZED_HASH_LEN: usize = 32;

/// The logical tables of the chain index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `hash -> number`. Key: 32-byte hash. Value: 8-byte big-endian number.
    RollupBlockHashToNumber,
    /// `number -> hash`. Key: 8-byte big-endian number. Value: 32-byte hash.
    RollupBlockNumberToHash,
}

impl Table {
    /// All tables, in declaration order.
    pub const ALL: [Self; 2] = [Self::RollupBlockHashToNumber, Self::RollupBlockNumberToHash];

    /// Returns the table name, which doubles as its key prefix.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RollupBlockHashToNumber => "RollupBlockHashToNumber",
            Self::RollupBlockNumberToHash => "RollupBlockNumberToHash",
        }
    }

    /// Returns the key prefix of the table.
    pub const fn prefix(&self) -> &'static [u8] {
        self.name().as_bytes()
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Combines a table name and a table-local key into a single sortable key.
pub fn table_key(table: Table, key: &[u8]) -> Vec<u8> {
    let prefix = table.prefix();
    let mut out = Vec::with_capacity(prefix.len() + key.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(key);
    out
}

/// Strips the table prefix from a full key. Returns `None` if the key belongs to another table.
pub fn strip_table_prefix(table: Table, key: &[u8]) -> Option<&[u8]> {
    key.strip_prefix(table.prefix())
}

/// Encodes a `u64` as 8 big-endian bytes.
pub const fn marshal_u64(num: u64) -> [u8; SERIALIZED_U64_LEN] {
    num.to_be_bytes()
}

/// A stored value had the wrong length for its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorruptionError {
    /// The value could not be decoded as a `u64`.
    #[error("could not unmarshal {0} bytes as a u64, expected 8; the db is likely corrupt")]
    InvalidU64(usize),
    /// The value could not be decoded as a block hash.
    #[error("could not unmarshal {0} bytes as a hash, expected 32; the db is likely corrupt")]
    InvalidHash(usize),
}

/// Decodes 8 big-endian bytes into a `u64`.
pub fn unmarshal_u64(raw: &[u8]) -> Result<u64, CorruptionError> {
    let bytes: [u8; SERIALIZED_U64_LEN] =
        raw.try_into().map_err(|_| CorruptionError::InvalidU64(raw.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Decodes exactly 32 bytes into a [`B256`].
pub fn unmarshal_hash(raw: &[u8]) -> Result<B256, CorruptionError> {
    if raw.len() != SERIALIZED_HASH_LEN {
        return Err(CorruptionError::InvalidHash(raw.len()));
    }
    Ok(B256::from_slice(raw))
}
