//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, Candidate};
use crate::core::config::EngineConfig;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Follow symbolic links. Without it, links are ignored entirely.
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Accepted extensions, lowercase without the dot
    pub extensions: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::default())
    }
}

impl ScanConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            include_hidden: config.include_hidden,
            max_depth: None,
            extensions: config.extensions.clone(),
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let filter = ImageFilter::new(&config.extensions).with_hidden(config.include_hidden);
        Self { config, filter }
    }

    /// Lazily yield every candidate under `roots`.
    ///
    /// Traversal problems (missing roots, unreadable directories, symlink
    /// cycles) are logged, sent as [`ScanEvent::Error`] and skipped.
    pub fn candidates<'a>(
        &'a self,
        roots: &'a [PathBuf],
        events: &'a EventSender,
    ) -> impl Iterator<Item = Candidate> + 'a {
        roots
            .iter()
            .filter_map(move |root| open_root(root, events))
            .flat_map(move |root| {
                let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
                if let Some(depth) = self.config.max_depth {
                    walker = walker.max_depth(depth);
                }

                walker
                    .into_iter()
                    .filter_entry(move |entry| {
                        entry.depth() == 0
                            || !entry.file_type().is_dir()
                            || self.filter.should_descend(entry.path())
                    })
                    .filter_map(move |entry| match entry {
                        Ok(entry) => self.accept(entry, events),
                        Err(e) => {
                            report(traversal_error(e), events);
                            None
                        }
                    })
            })
    }

    fn accept(&self, entry: DirEntry, events: &EventSender) -> Option<Candidate> {
        if !entry.file_type().is_file() || !self.filter.should_include(entry.path()) {
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => Some(Candidate {
                path: entry.into_path(),
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            }),
            Err(e) => {
                report(traversal_error(e), events);
                None
            }
        }
    }
}

/// Resolve a root to an absolute directory path
fn open_root(root: &Path, events: &EventSender) -> Option<PathBuf> {
    match fs::canonicalize(root) {
        Ok(path) if path.is_dir() => Some(path),
        _ => {
            report(
                ScanError::DirectoryNotFound {
                    path: root.to_path_buf(),
                },
                events,
            );
            None
        }
    }
}

fn traversal_error(e: walkdir::Error) -> ScanError {
    let path = e.path().map(Path::to_path_buf).unwrap_or_default();

    if e.loop_ancestor().is_some() {
        ScanError::SymlinkLoop { path }
    } else if e.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: e.into(),
        }
    }
}

fn report(error: ScanError, events: &EventSender) {
    let path = match &error {
        ScanError::DirectoryNotFound { path }
        | ScanError::PermissionDenied { path }
        | ScanError::ReadDirectory { path, .. }
        | ScanError::SymlinkLoop { path } => path.clone(),
        ScanError::Cancelled => PathBuf::new(),
    };

    warn!(path = %path.display(), error = %error, "Skipping during traversal");
    events.send(Event::Scan(ScanEvent::Error {
        path,
        message: error.to_string(),
    }));
}
