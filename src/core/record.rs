//! Per-file records tracked by the store.

use crate::core::hasher::ImageHashValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use xxhash_rust::xxh3::{xxh3_128, Xxh3};

/// Stable key for one version of one file.
///
/// Derived from the absolute path, size and modification time, so any edit
/// to the file yields a new identity and retires the old record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Derive the identity of a file version
    pub fn for_file(path: &Path, size: u64, modified: SystemTime) -> Self {
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let path_text = path.to_string_lossy();
        let mut key = Vec::with_capacity(path_text.len() + 1 + 8 + 16);
        key.extend_from_slice(path_text.as_bytes());
        key.push(0);
        key.extend_from_slice(&size.to_le_bytes());
        key.extend_from_slice(&nanos.to_le_bytes());

        Self(format!("{:032x}", xxh3_128(&key)))
    }

    /// Wrap an identity read back from storage
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Observed, features not yet computed
    Pending,
    /// Perceptual hash present, no embedding
    Hashed,
    /// Perceptual hash and embedding present
    Embedded,
    /// Could not be decoded; excluded from comparison
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Hashed => "hashed",
            RecordStatus::Embedded => "embedded",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RecordStatus::Pending),
            "hashed" => Some(RecordStatus::Hashed),
            "embedded" => Some(RecordStatus::Embedded),
            "failed" => Some(RecordStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked image file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub identity: Identity,
    pub path: PathBuf,
    pub file_size: u64,
    pub modified: SystemTime,
    pub status: RecordStatus,
    pub perceptual_hash: Option<ImageHashValue>,
    pub embedding: Option<Vec<f32>>,
    /// Model id of the last embedding attempt, successful or not
    pub embedding_model: Option<String>,
    /// Whole-file xxh3-128 digest, hex
    pub content_digest: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Laplacian variance of the luminance, higher is sharper
    pub sharpness: Option<f64>,
    /// Diagnostic, set only when `status` is `Failed`
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ImageRecord {
    /// Skeleton for a newly observed file
    pub fn pending(path: PathBuf, file_size: u64, modified: SystemTime) -> Self {
        Self {
            identity: Identity::for_file(&path, file_size, modified),
            path,
            file_size,
            modified,
            status: RecordStatus::Pending,
            perceptual_hash: None,
            embedding: None,
            embedding_model: None,
            content_digest: None,
            width: 0,
            height: 0,
            sharpness: None,
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Mark this record failed, discarding every feature from the attempt
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = RecordStatus::Failed;
        self.perceptual_hash = None;
        self.embedding = None;
        self.embedding_model = None;
        self.content_digest = None;
        self.sharpness = None;
        self.last_error = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Recompute `status` from the features present
    pub fn settle_status(&mut self) {
        self.status = match (&self.perceptual_hash, &self.embedding) {
            (Some(_), Some(_)) => RecordStatus::Embedded,
            (Some(_), None) => RecordStatus::Hashed,
            // An embedding without a hash never leaves the worker; keep it comparable
            (None, Some(_)) => RecordStatus::Embedded,
            (None, None) => RecordStatus::Pending,
        };
        self.last_error = None;
        self.updated_at = Utc::now();
    }

    /// Work still needed for this record under the active feature versions
    pub fn pending_work(&self, versions: &FeatureVersions) -> PendingWork {
        if matches!(self.status, RecordStatus::Pending | RecordStatus::Failed) {
            return PendingWork {
                hash: true,
                embedding: versions.embedding_model.is_some(),
            };
        }

        // Sharpness rides along with the hash; records from before it existed get both
        let hash = match &self.perceptual_hash {
            Some(hash) => hash.version_tag() != versions.hash_version || self.sharpness.is_none(),
            None => true,
        };

        let embedding = match &versions.embedding_model {
            Some(model) => {
                self.embedding_model.as_deref() != Some(model.as_str())
                    || self
                        .embedding
                        .as_ref()
                        .is_some_and(|e| Some(e.len()) != versions.dimension)
            }
            None => false,
        };

        PendingWork { hash, embedding }
    }

    /// Hash usable for comparison under the active versions
    pub fn current_hash(&self, versions: &FeatureVersions) -> Option<&ImageHashValue> {
        if self.status == RecordStatus::Failed {
            return None;
        }
        self.perceptual_hash
            .as_ref()
            .filter(|h| h.version_tag() == versions.hash_version)
    }

    /// Embedding usable for comparison under the active versions
    pub fn current_embedding(&self, versions: &FeatureVersions) -> Option<&[f32]> {
        if self.status == RecordStatus::Failed {
            return None;
        }
        let model = versions.embedding_model.as_deref()?;
        if self.embedding_model.as_deref() != Some(model) {
            return None;
        }
        self.embedding
            .as_deref()
            .filter(|e| Some(e.len()) == versions.dimension)
    }
}

/// Feature versions produced by the active hasher and embedder.
///
/// Records computed under other versions are stale: their features are
/// recomputed on the next scan and ignored by the comparator until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVersions {
    pub hash_version: String,
    pub embedding_model: Option<String>,
    pub dimension: Option<usize>,
}

/// Which features a record still needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingWork {
    pub hash: bool,
    pub embedding: bool,
}

impl PendingWork {
    pub fn is_empty(&self) -> bool {
        !self.hash && !self.embedding
    }
}

/// Whole-file xxh3-128 digest, hex encoded
pub fn content_digest(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:032x}", hasher.digest128()))
}
