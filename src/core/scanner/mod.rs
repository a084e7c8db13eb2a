//! # Scanner Module
//!
//! Discovers candidate image files under a set of roots and works out which
//! stored records no longer match the filesystem.
//!
//! Traversal is lazy and depth-unbounded. With `follow_symlinks` on, a link
//! back to an ancestor directory is reported as [`ScanError::SymlinkLoop`]
//! and skipped rather than followed forever.
//!
//! ## Example
//! ```rust,ignore
//! use spectramatch::core::scanner::{ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! for candidate in scanner.candidates(&["/photos".into()], &null_sender()) {
//!     println!("{}", candidate.path.display());
//! }
//! ```
//!
//! [`ScanError::SymlinkLoop`]: crate::error::ScanError::SymlinkLoop

mod filter;
mod reconcile;
mod walker;

pub use filter::ImageFilter;
pub use reconcile::retired_identities;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::core::record::Identity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A file that passed the filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Absolute path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
}

impl Candidate {
    /// Identity of the file as it is now
    pub fn identity(&self) -> Identity {
        Identity::for_file(&self.path, self.size, self.modified)
    }
}
