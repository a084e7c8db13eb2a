//! # Pipeline Module
//!
//! Orchestrates the full duplicate detection workflow.
//!
//! ## Pipeline Stages
//! 1. **Discover** - walk the roots, skip files whose features are current,
//!    retire records whose files vanished or changed
//! 2. **Process** - decode, digest, hash and embed pending files on a bounded
//!    worker pool, committing each batch to the store
//! 3. **Index** - apply the scan's changes to the nearest-neighbor index
//! 4. **Compare** - group duplicates; can be re-run with other thresholds
//!    without rescanning
//!
//! ## Cancellation
//! A [`CancellationToken`] stops new batches from being dispatched. Batches
//! already running finish and commit, so a cancelled scan leaves only fully
//! processed records behind and the next scan picks up where it stopped.

mod executor;

pub use executor::{Pipeline, PipelineBuilder};

use crate::core::comparator::DuplicateGroup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag shared with a running scan
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the scan to stop dispatching work
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A file whose processing failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Candidate files found under the roots
    pub candidates: usize,
    /// Records written this scan, failures included
    pub processed: usize,
    /// Candidates whose features were already current
    pub skipped: usize,
    /// Records that ended up `Failed`
    pub failed: usize,
    /// Records removed because their file vanished or changed
    pub retired: usize,
    /// Records left hash-only because inference failed
    pub embedding_failures: usize,
    pub cancelled: bool,
    pub duration: Duration,
    pub failures: Vec<FileFailure>,
}

/// A scan followed by a comparison at the configured thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub report: ScanReport,
    /// Empty when the scan was cancelled
    pub groups: Vec<DuplicateGroup>,
}

impl PipelineResult {
    /// Bytes freed by keeping only each group's representative
    pub fn potential_savings_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.duplicate_size_bytes).sum()
    }
}
