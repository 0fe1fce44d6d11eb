//! Node store trait and implementations for the sparse merkle trie

mod memory;

pub use memory::MemoryDb;

use crate::TreeError;

/// Thread safety marker trait
#[cfg(feature = "multi-thread")]
pub trait ThreadSafe: Send + Sync {}
#[cfg(feature = "multi-thread")]
impl<T: Send + Sync> ThreadSafe for T {}

#[cfg(not(feature = "multi-thread"))]
pub trait ThreadSafe {}
#[cfg(not(feature = "multi-thread"))]
impl<T> ThreadSafe for T {}

/// Store for the trie nodes
///
/// Nodes are stored as opaque records keyed by their digest. The trie never
/// asks the store to interpret a record; it only reads, writes and removes
/// them.
pub trait Db: ThreadSafe {
    /// The error type for store operations
    type DbError;

    /// Get the record stored under `key`, if any
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError<Self::DbError>>;

    /// Store `value` under `key`, replacing any previous record
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TreeError<Self::DbError>>;

    /// Remove the record under `key`. Removing a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<Self::DbError>>;

    /// Number of records in the store
    fn len(&self) -> Result<usize, TreeError<Self::DbError>>;

    fn is_empty(&self) -> Result<bool, TreeError<Self::DbError>> {
        Ok(self.len()? == 0)
    }

    /// Remove every record
    fn clear_all(&mut self) -> Result<(), TreeError<Self::DbError>>;
}
