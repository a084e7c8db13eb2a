//! # Store Module
//!
//! Durable `identity -> ImageRecord` persistence.
//!
//! ## Backends
//! - `SqliteStore` - a single self-contained SQLite file with a versioned schema
//! - `InMemoryStore` - for tests and throwaway runs
//!
//! Readers may run alongside writers. Writes are serialized by the backend,
//! and every single-record write is atomic, so an interrupted scan leaves
//! at most the record being written behind, never a half-written one.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryStore;
pub use sqlite::{SqliteStore, SCHEMA_VERSION};
pub use traits::RecordStore;

use crate::core::record::RecordStatus;
use serde::{Deserialize, Serialize};

/// Record counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub pending: usize,
    pub hashed: usize,
    pub embedded: usize,
    pub failed: usize,
    /// Sum of tracked file sizes
    pub total_bytes: u64,
}

impl StoreStats {
    pub(crate) fn add(&mut self, status: RecordStatus, file_size: u64) {
        self.total += 1;
        self.total_bytes += file_size;
        match status {
            RecordStatus::Pending => self.pending += 1,
            RecordStatus::Hashed => self.hashed += 1,
            RecordStatus::Embedded => self.embedded += 1,
            RecordStatus::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_tally_by_status() {
        let mut stats = StoreStats::default();
        stats.add(RecordStatus::Embedded, 100);
        stats.add(RecordStatus::Failed, 50);
        stats.add(RecordStatus::Embedded, 10);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.embedded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 160);
    }
}
