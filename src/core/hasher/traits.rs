//! Trait definitions for perceptual hashing.

use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Bumped whenever an algorithm's output changes for the same input.
///
/// Stored hashes tagged with an older revision are recomputed.
pub const HASH_REVISION: u32 = 1;

/// A computed perceptual hash that can be compared
pub trait PerceptualHash: Clone + Send + Sync {
    /// Number of bits that differ between the two hashes.
    ///
    /// Lower distance = more similar images.
    fn distance(&self, other: &Self) -> u32;

    /// Get the raw hash bytes
    fn as_bytes(&self) -> &[u8];

    /// Get the hash as a hexadecimal string
    fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Get the total number of bits in this hash
    fn bit_count(&self) -> u32 {
        (self.as_bytes().len() * 8) as u32
    }

    /// Similarity normalized to [0, 1]; 1.0 means identical fingerprints
    fn similarity(&self, other: &Self) -> f64 {
        let max_distance = self.bit_count();
        if max_distance == 0 {
            return 1.0;
        }
        1.0 - (self.distance(other) as f64 / max_distance as f64)
    }
}

/// Available hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithmKind {
    /// Difference Hash (dHash) - brightness gradients between neighbors
    Difference,
    /// Perceptual Hash (pHash) - DCT low frequencies, robust to re-encoding
    Perceptual,
}

impl HashAlgorithmKind {
    /// Short tag used in stored version strings
    pub fn tag(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Difference => "dhash",
            HashAlgorithmKind::Perceptual => "phash",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "dhash" => Some(HashAlgorithmKind::Difference),
            "phash" => Some(HashAlgorithmKind::Perceptual),
            _ => None,
        }
    }

    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            HashAlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to resizing and recompression"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Perceptual => write!(f, "pHash"),
        }
    }
}

/// Trait for hash algorithm implementations.
///
/// Implementations are pure: the same pixels always give the same hash.
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from an already-decoded image
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHashValue, HashError>;

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;

    /// Width of every hash this algorithm produces
    fn bit_count(&self) -> u32;

    /// Version tag stored next to each hash, e.g. `phash-64-v1`
    fn version_tag(&self) -> String {
        version_tag(self.kind(), self.bit_count())
    }
}

pub(crate) fn version_tag(kind: HashAlgorithmKind, bits: u32) -> String {
    format!("{}-{}-v{}", kind.tag(), bits, HASH_REVISION)
}

/// Concrete hash value type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHashValue {
    /// The raw hash bytes
    bytes: Vec<u8>,
    /// The algorithm that produced this hash
    algorithm: HashAlgorithmKind,
}

impl ImageHashValue {
    /// Create a new hash value
    pub fn new(bytes: Vec<u8>, algorithm: HashAlgorithmKind) -> Self {
        Self { bytes, algorithm }
    }

    /// Restore a stored hash from its bytes and version tag.
    ///
    /// Returns `None` when the tag does not describe these bytes or names an
    /// older revision; callers treat that as a stale hash.
    pub fn from_stored(bytes: &[u8], tag: &str) -> Option<Self> {
        let mut parts = tag.split('-');
        let algorithm = HashAlgorithmKind::from_tag(parts.next()?)?;
        let bits: usize = parts.next()?.parse().ok()?;
        let revision: u32 = parts.next()?.strip_prefix('v')?.parse().ok()?;
        if bits != bytes.len() * 8 || revision != HASH_REVISION || parts.next().is_some() {
            return None;
        }
        Some(Self::new(bytes.to_vec(), algorithm))
    }

    /// Get the algorithm that produced this hash
    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.algorithm
    }

    /// Version tag of this hash under the current revision
    pub fn version_tag(&self) -> String {
        version_tag(self.algorithm, self.bit_count())
    }

    /// Extract `width` bits starting at `start` as an integer (width ≤ 64)
    pub fn bit_range(&self, start: usize, width: usize) -> u64 {
        let mut value = 0u64;
        for offset in 0..width.min(64) {
            let bit_idx = start + offset;
            let byte_idx = bit_idx / 8;
            if byte_idx >= self.bytes.len() {
                break;
            }
            let bit = (self.bytes[byte_idx] >> (7 - bit_idx % 8)) & 1;
            value |= (bit as u64) << offset;
        }
        value
    }
}

impl PerceptualHash for ImageHashValue {
    fn distance(&self, other: &Self) -> u32 {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
