//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning and feature extraction events
    Scan(ScanEvent),
    /// Nearest-neighbor index maintenance events
    Index(IndexEvent),
    /// Comparison phase events
    Compare(CompareEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { roots: Vec<PathBuf> },
    /// Directory traversal finished
    Discovered {
        /// Candidate image files found under the roots
        candidates: usize,
        /// Candidates that need processing (new, changed, failed or stale)
        pending: usize,
    },
    /// Progress update during processing
    Progress(ScanProgress),
    /// A file could not be processed; scanning continues
    FileFailed { path: PathBuf, message: String },
    /// A traversal error (unreadable directory, symlink cycle); scanning continues
    Error { path: PathBuf, message: String },
    /// Records whose files vanished or changed were removed
    Retired { count: usize },
    /// Scanning completed
    Completed {
        processed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Progress information during processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of files processed so far
    pub processed: usize,
    /// Total number of files to process in this scan
    pub total: usize,
    /// Most recently processed file
    pub current_path: PathBuf,
}

/// Events from index maintenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexEvent {
    /// The index was rebuilt from the store
    Rebuilt { entries: usize },
    /// The index was updated incrementally
    Updated { inserted: usize, removed: usize },
}

/// Events during the comparison phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// Comparison has started
    Started { total_records: usize },
    /// Comparison completed
    Completed {
        total_groups: usize,
        total_duplicates: usize,
    },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled; the store holds every record committed so far
    Cancelled,
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Discovering,
    Processing,
    Indexing,
    Comparing,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Records tracked in the store after the scan
    pub total_records: usize,
    /// Number of duplicate groups found
    pub duplicate_groups: usize,
    /// Total number of duplicate images (excluding representatives)
    pub duplicate_count: usize,
    /// Potential space savings in bytes
    pub potential_savings_bytes: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Discovering => write!(f, "Discovering"),
            PipelinePhase::Processing => write!(f, "Processing"),
            PipelinePhase::Indexing => write!(f, "Indexing"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Scan(ScanEvent::Progress(ScanProgress {
            processed: 10,
            total: 50,
            current_path: PathBuf::from("/photos/a.jpg"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.processed, 10);
                assert_eq!(p.total, 50);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn pipeline_summary_is_serializable() {
        let summary = PipelineSummary {
            total_records: 1000,
            duplicate_groups: 50,
            duplicate_count: 150,
            potential_savings_bytes: 500_000_000,
            duration_ms: 5000,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("500000000"));
    }

    #[test]
    fn phase_display() {
        assert_eq!(PipelinePhase::Indexing.to_string(), "Indexing");
    }
}
