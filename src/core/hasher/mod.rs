//! # Hasher Module
//!
//! Computes perceptual hashes for decoded images.
//!
//! ## Supported Algorithms
//! - **pHash (Perceptual Hash)** - DCT low frequencies; the default
//! - **dHash (Difference Hash)** - horizontal brightness gradients
//!
//! Both produce `hash_size * hash_size` bits and are compared by Hamming
//! distance. Hashes are tagged with [`HashAlgorithm::version_tag`] so a
//! change of algorithm or size is detected as stale data in the store.
//!
//! ## Example
//! ```rust,ignore
//! use spectramatch::core::hasher::{HasherConfig, HashAlgorithmKind};
//!
//! let hasher = HasherConfig::new()
//!     .algorithm(HashAlgorithmKind::Perceptual)
//!     .hash_size(8)
//!     .build()?;
//!
//! let hash = hasher.hash_image(&image)?;
//! ```

mod algorithms;
mod traits;

pub use algorithms::{DifferenceHasher, PerceptualHasher};
pub use traits::{HashAlgorithm, HashAlgorithmKind, ImageHashValue, PerceptualHash, HASH_REVISION};

use crate::error::HashError;

/// Hash sizes with a well-defined bit layout
const SUPPORTED_SIZES: [u32; 2] = [8, 16];

/// Configuration builder for hashers
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Side of the hash grid; the hash has `hash_size^2` bits
    hash_size: u32,
    algorithm: HashAlgorithmKind,
}

impl HasherConfig {
    /// Create a new hasher configuration with defaults (64-bit pHash)
    pub fn new() -> Self {
        Self {
            hash_size: 8,
            algorithm: HashAlgorithmKind::Perceptual,
        }
    }

    /// Set the hash size (8 or 16)
    ///
    /// - 8: 64 bits
    /// - 16: 256 bits, finer grained, thresholds scale accordingly
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Set the hash algorithm
    pub fn algorithm(mut self, algorithm: HashAlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Build the hasher
    pub fn build(self) -> Result<Box<dyn HashAlgorithm>, HashError> {
        if !SUPPORTED_SIZES.contains(&self.hash_size) {
            return Err(HashError::ComputationFailed(format!(
                "unsupported hash size {} (expected 8 or 16)",
                self.hash_size
            )));
        }

        Ok(match self.algorithm {
            HashAlgorithmKind::Difference => Box::new(DifferenceHasher::new(self.hash_size)),
            HashAlgorithmKind::Perceptual => Box::new(PerceptualHasher::new(self.hash_size)),
        })
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
