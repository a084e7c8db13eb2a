//! Store backend trait definition.

use super::StoreStats;
use crate::core::record::{Identity, ImageRecord};
use crate::error::StoreError;
use std::path::PathBuf;

/// Trait for record store backends
pub trait RecordStore: Send + Sync {
    /// Look up one record
    fn get(&self, identity: &Identity) -> Result<Option<ImageRecord>, StoreError>;

    /// Insert or replace a record
    fn upsert(&self, record: &ImageRecord) -> Result<(), StoreError>;

    /// Insert or replace several records atomically
    fn upsert_batch(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        for record in records {
            self.upsert(record)?;
        }
        Ok(())
    }

    /// Delete a record. Returns whether it existed.
    fn remove(&self, identity: &Identity) -> Result<bool, StoreError>;

    /// Delete several records. Returns how many existed.
    fn remove_batch(&self, identities: &[Identity]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for identity in identities {
            if self.remove(identity)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Every record, in identity order
    fn all_records(&self) -> Result<Vec<ImageRecord>, StoreError>;

    /// Identity and path of every record, without feature data
    fn locations(&self) -> Result<Vec<(Identity, PathBuf)>, StoreError>;

    /// Number of records
    fn count(&self) -> Result<usize, StoreError>;

    /// Counts by status
    fn stats(&self) -> Result<StoreStats, StoreError>;
}
