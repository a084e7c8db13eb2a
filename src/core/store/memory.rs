//! In-memory store backend for testing.

use super::{RecordStore, StoreStats};
use crate::core::record::{Identity, ImageRecord};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store backend
///
/// Nothing survives the process; useful for tests and one-off comparisons.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<Identity, ImageRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Identity, ImageRecord>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Identity, ImageRecord>>, StoreError> {
        self.records.write().map_err(|_| StoreError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl RecordStore for InMemoryStore {
    fn get(&self, identity: &Identity) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.read()?.get(identity).cloned())
    }

    fn upsert(&self, record: &ImageRecord) -> Result<(), StoreError> {
        self.write()?.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    fn upsert_batch(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        let mut map = self.write()?;
        for record in records {
            map.insert(record.identity.clone(), record.clone());
        }
        Ok(())
    }

    fn remove(&self, identity: &Identity) -> Result<bool, StoreError> {
        Ok(self.write()?.remove(identity).is_some())
    }

    fn all_records(&self) -> Result<Vec<ImageRecord>, StoreError> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn locations(&self) -> Result<Vec<(Identity, PathBuf)>, StoreError> {
        Ok(self
            .read()?
            .values()
            .map(|r| (r.identity.clone(), r.path.clone()))
            .collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let mut stats = StoreStats::default();
        for record in self.read()?.values() {
            stats.add(record.status, record.file_size);
        }
        Ok(stats)
    }
}
