use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use crate::chain::ChainStore;

/// Process-local store backed by a `HashMap`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChainStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put_all(&self, batch: &[(&[u8], &[u8])]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        for (key, value) in batch {
            entries.insert(key.to_vec(), value.to_vec());
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(b"missing").unwrap(), None);

        store.put(b"k", b"v").unwrap();
        store
            .put_all(&[
                (b"a".as_slice(), b"1".as_slice()),
                (b"k".as_slice(), b"w".as_slice()),
            ])
            .unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"w".to_vec()));
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.len(), 2);
    }
}
