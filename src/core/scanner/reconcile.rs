//! Reconciliation of stored records against the filesystem.

use crate::core::record::Identity;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Stored identities that should be retired.
///
/// A record is kept when traversal saw its identity. Otherwise its path is
/// checked directly: retired when the file is gone or now has a different
/// identity (it was modified), kept when it still matches. The last case
/// covers files traversal skipped, such as one behind an unreadable
/// directory. Result is in identity order.
pub fn retired_identities(stored: Vec<(Identity, PathBuf)>, seen: &HashSet<Identity>) -> Vec<Identity> {
    let mut retired: Vec<Identity> = stored
        .into_par_iter()
        .filter(|(identity, _)| !seen.contains(identity))
        .filter(|(identity, path)| current_identity(path).as_ref() != Some(identity))
        .map(|(identity, _)| identity)
        .collect();
    retired.sort();
    retired
}

fn current_identity(path: &Path) -> Option<Identity> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    Some(Identity::for_file(path, metadata.len(), modified))
}
