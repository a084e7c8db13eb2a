//! Engine configuration.
//!
//! Stored as pretty-printed JSON. Every field has a default, so a partial
//! file (or none at all) is a valid configuration.

use crate::core::hasher::HashAlgorithmKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "spectramatch";

/// Everything the engine can be tuned with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directories to scan
    pub roots: Vec<PathBuf>,
    /// Accepted extensions, lowercase without the dot
    pub extensions: Vec<String>,
    /// Descend into dot-directories and pick up dot-files
    pub include_hidden: bool,
    /// Follow symbolic links; cycles are detected and skipped
    pub follow_symlinks: bool,
    /// Worker threads, 0 = one per available core
    pub workers: usize,
    /// Images handed to the model per inference call
    pub embed_batch_size: usize,
    pub hash_algorithm: HashAlgorithmKind,
    /// Side of the hash grid: 8 gives 64 bits, 16 gives 256
    pub hash_size: u32,
    /// Maximum Hamming distance for a hash match
    pub hash_threshold: u32,
    /// Maximum cosine distance for an embedding match
    pub embedding_threshold: f32,
    /// At or below this many hashed records the hash pass compares all pairs
    pub exhaustive_cutoff: usize,
    /// Neighbors requested per embedding query
    pub neighbor_k: usize,
    pub index: IndexConfig,
    /// SQLite file holding the records
    pub store_path: PathBuf,
}

/// Which nearest-neighbor structure to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact linear scan
    Flat,
    /// Inverted file with a k-means coarse quantizer
    Ivf,
}

/// Nearest-neighbor index tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub kind: IndexKind,
    /// Inverted lists, 0 = square root of the entry count
    pub lists: usize,
    /// Fraction of lists probed per query, in (0, 1].
    ///
    /// This is the recall knob: 1.0 is exact, lower values skip clusters
    /// far from the query and may miss neighbors near cluster borders.
    pub probe_fraction: f32,
    /// Below this many entries the index scans exhaustively
    pub min_train_size: usize,
    /// Tombstone fraction that triggers a rebuild
    pub rebuild_ratio: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            kind: IndexKind::Ivf,
            lists: 0,
            probe_fraction: 0.25,
            min_train_size: 1024,
            rebuild_ratio: 0.25,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif"]
                .into_iter()
                .map(String::from)
                .collect(),
            include_hidden: false,
            follow_symlinks: false,
            workers: 0,
            embed_batch_size: 8,
            hash_algorithm: HashAlgorithmKind::Perceptual,
            hash_size: 8,
            hash_threshold: 10,
            embedding_threshold: 0.10,
            exhaustive_cutoff: 2000,
            neighbor_k: 32,
            index: IndexConfig::default(),
            store_path: default_store_path(),
        }
    }
}

impl EngineConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR)
            .join("config.json")
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let unwritable = |reason: String| ConfigError::Unwritable {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| unwritable(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|e| unwritable(e.to_string()))?;
        fs::write(path, text).map_err(|e| unwritable(e.to_string()))
    }

    /// Number of hash bits produced by the configured hasher
    pub fn hash_bits(&self) -> u32 {
        self.hash_size * self.hash_size
    }

    /// Worker count with 0 resolved to the core count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_size != 8 && self.hash_size != 16 {
            return Err(invalid("hash_size", format!("{} is not 8 or 16", self.hash_size)));
        }
        check_thresholds(self.hash_threshold, self.embedding_threshold, self.hash_bits())?;
        if self.extensions.is_empty() {
            return Err(invalid("extensions", "at least one extension is required".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(invalid("embed_batch_size", "must be at least 1".to_string()));
        }
        if self.neighbor_k == 0 {
            return Err(invalid("neighbor_k", "must be at least 1".to_string()));
        }
        if !(self.index.probe_fraction > 0.0 && self.index.probe_fraction <= 1.0) {
            return Err(invalid(
                "index.probe_fraction",
                format!("{} is outside (0, 1]", self.index.probe_fraction),
            ));
        }
        if !(self.index.rebuild_ratio > 0.0 && self.index.rebuild_ratio <= 1.0) {
            return Err(invalid(
                "index.rebuild_ratio",
                format!("{} is outside (0, 1]", self.index.rebuild_ratio),
            ));
        }
        Ok(())
    }
}

/// Validate a pair of comparison thresholds against the hash width
pub fn check_thresholds(
    hash_threshold: u32,
    embedding_threshold: f32,
    hash_bits: u32,
) -> Result<(), ConfigError> {
    if hash_threshold > hash_bits {
        return Err(invalid(
            "hash_threshold",
            format!("{} exceeds the {}-bit hash width", hash_threshold, hash_bits),
        ));
    }
    if !(0.0..=2.0).contains(&embedding_threshold) {
        return Err(invalid(
            "embedding_threshold",
            format!("{} is outside [0, 2]", embedding_threshold),
        ));
    }
    Ok(())
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { name, reason }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("library.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hash_threshold, 10);
        assert_eq!(config.hash_bits(), 64);
        assert_eq!(config.index.kind, IndexKind::Ivf);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "hash_threshold": 4, "index": { "kind": "flat" } }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.hash_threshold, 4);
        assert_eq!(config.index.kind, IndexKind::Flat);
        assert_eq!(config.index.probe_fraction, 0.25);
        assert_eq!(config.neighbor_k, 32);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = EngineConfig::default();
        config.roots = vec![PathBuf::from("/photos")];
        config.hash_algorithm = HashAlgorithmKind::Difference;
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            EngineConfig::load(&path),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = EngineConfig::default();
        config.hash_threshold = 65;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.embedding_threshold = 2.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.index.probe_fraction = 0.0;
        assert!(config.validate().is_err());
    }
}
