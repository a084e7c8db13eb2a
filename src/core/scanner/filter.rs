//! File filtering logic for the scanner.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

/// Decides which files are candidate images
#[derive(Debug, Clone)]
pub struct ImageFilter {
    /// Lowercase extensions without the dot
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl ImageFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include dot-files and dot-directories
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Should the file at `path` be processed?
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && is_hidden(path.file_name()) {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Should traversal descend into the directory at `path`?
    pub fn should_descend(&self, path: &Path) -> bool {
        self.include_hidden || !is_hidden(path.file_name())
    }
}

fn is_hidden(name: Option<&OsStr>) -> bool {
    name.and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n != "." && n != "..")
        .unwrap_or(false)
}
