use std::collections::HashMap;

use crate::{db::Db, error::MemoryDbError, TreeError};

/// A simple in-memory store, mainly for tests and ephemeral tries
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    records: HashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &HashMap<Vec<u8>, Vec<u8>> {
        &self.records
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.records.contains_key(key)
    }
}

impl Db for MemoryDb {
    type DbError = MemoryDbError;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError<Self::DbError>> {
        if key.is_empty() {
            return Err(TreeError::Db(MemoryDbError::EmptyKey));
        }
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), TreeError<Self::DbError>> {
        if key.is_empty() {
            return Err(TreeError::Db(MemoryDbError::EmptyKey));
        }
        self.records.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<Self::DbError>> {
        if key.is_empty() {
            return Err(TreeError::Db(MemoryDbError::EmptyKey));
        }
        self.records.remove(key);
        Ok(())
    }

    fn len(&self) -> Result<usize, TreeError<Self::DbError>> {
        Ok(self.records.len())
    }

    fn clear_all(&mut self) -> Result<(), TreeError<Self::DbError>> {
        self.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::MemoryDb;
    use crate::{db::Db, error::MemoryDbError, TreeError};

    #[test]
    fn test_memory_db_set_get() {
        let mut db = MemoryDb::new();
        assert_eq!(db.get(b"key").unwrap(), None);
        db.set(b"key", b"value").unwrap();
        assert_eq!(db.get(b"key").unwrap(), Some(b"value".to_vec()));
        db.set(b"key", b"other").unwrap();
        assert_eq!(db.get(b"key").unwrap(), Some(b"other".to_vec()));
        assert_eq!(db.len().unwrap(), 1);
    }

    #[test]
    fn test_memory_db_delete() {
        let mut db = MemoryDb::new();
        db.set(b"key", b"value").unwrap();
        db.delete(b"key").unwrap();
        assert!(db.is_empty().unwrap());
        // missing keys are fine
        db.delete(b"key").unwrap();
    }

    #[test]
    fn test_memory_db_empty_key() {
        let mut db = MemoryDb::new();
        assert_eq!(db.get(b""), Err(TreeError::Db(MemoryDbError::EmptyKey)));
        assert_eq!(db.set(b"", b"v"), Err(TreeError::Db(MemoryDbError::EmptyKey)));
        assert_eq!(db.delete(b""), Err(TreeError::Db(MemoryDbError::EmptyKey)));
    }

    #[test]
    fn test_memory_db_clear_all() {
        let mut db = MemoryDb::new();
        db.set(b"a", b"1").unwrap();
        db.set(b"b", b"2").unwrap();
        db.clear_all().unwrap();
        assert_eq!(db.len().unwrap(), 0);
        assert!(!db.contains(b"a"));
    }
}
