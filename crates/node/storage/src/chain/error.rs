//! Error types for the chain index.

use crate::{CorruptionError, StoreError, Table};
use alloy_primitives::B256;
use thiserror::Error;

/// The key a failed lookup was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey {
    /// Lookup by block hash.
    Hash(B256),
    /// Lookup by block number.
    Number(u64),
}

impl core::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "hash {hash}"),
            Self::Number(number) => write!(f, "number {number}"),
        }
    }
}

/// Why a lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    /// The key was never stored.
    Absent,
    /// The requested height is above the highest stored height.
    PastHead {
        /// Highest stored height.
        head: u64,
    },
    /// The requested height is at or below the head but has no entry. The index has a gap.
    Missing {
        /// The height the scan landed on instead, if any.
        found: Option<u64>,
    },
}

/// A lookup in the chain index found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub struct NotFoundError {
    /// The key that was looked up.
    pub key: LookupKey,
    /// The specific reason.
    pub kind: NotFoundKind,
    /// The table that was searched.
    pub table: Table,
}

impl NotFoundError {
    /// A human readable reason for the failure.
    pub fn reason(&self) -> String {
        match self.kind {
            NotFoundKind::Absent => "no entry stored".to_string(),
            NotFoundKind::PastHead { head } => format!("past the chain head at {head}"),
            NotFoundKind::Missing { found: Some(found) } => {
                format!("entry missing below the head, scan landed on {found}")
            }
            NotFoundKind::Missing { found: None } => {
                "entry missing below the head, scan ran off the table".to_string()
            }
        }
    }
}

impl core::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} not found in {}: {}", self.key, self.table, self.reason())
    }
}

/// Errors returned by the chain index and its cursor.
#[derive(Debug, Error)]
pub enum ChainIndexError {
    /// The requested entry does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// A stored value has the wrong length.
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    /// The cursor cannot move past a boundary.
    #[error("cursor exhausted")]
    Exhausted,
    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainIndexError {
    /// Returns `true` for any not-found error, including [`NotFoundKind::PastHead`] and
    /// [`NotFoundKind::Missing`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if a seek went past the head.
    pub const fn is_past_head(&self) -> bool {
        matches!(self, Self::NotFound(NotFoundError { kind: NotFoundKind::PastHead { .. }, .. }))
    }

    /// Returns `true` if an entry at or below the head is missing.
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(NotFoundError { kind: NotFoundKind::Missing { .. }, .. }))
    }

    /// Returns `true` if a cursor hit a boundary.
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns `true` if a stored value is corrupted.
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ChainIndexError::from(NotFoundError {
            key: LookupKey::Number(12),
            kind: NotFoundKind::PastHead { head: 10 },
            table: Table::RollupBlockNumberToHash,
        });
        assert_eq!(
            err.to_string(),
            "number 12 not found in RollupBlockNumberToHash: past the chain head at 10"
        );
        assert!(err.is_not_found());
        assert!(err.is_past_head());
        assert!(!err.is_missing());
    }

    #[test]
    fn test_missing_is_not_past_head() {
        let err = ChainIndexError::from(NotFoundError {
            key: LookupKey::Number(3),
            kind: NotFoundKind::Missing { found: Some(4) },
            table: Table::RollupBlockNumberToHash,
        });
        assert!(err.is_not_found());
        assert!(err.is_missing());
        assert!(!err.is_past_head());
        assert!(!err.is_corruption());
    }
}
