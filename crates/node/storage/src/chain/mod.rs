//! The height to hash chain index.

mod error;
pub use error::{ChainIndexError, LookupKey, NotFoundError, NotFoundKind};

mod index;
pub use index::{ChainIndex, GENESIS_HASH};

mod cursor;
pub use cursor::BlockHashCursor;
