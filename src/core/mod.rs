//! # Core Module
//!
//! The GUI-agnostic duplicate detection engine.
//!
//! ## Modules
//! - `scanner` - Discovers candidate images and retires vanished ones
//! - `decode` - Turns files into pixels
//! - `hasher` - Computes perceptual hashes
//! - `embedder` - Computes unit-length embeddings through an injected model
//! - `store` - Persists records between runs
//! - `index` - Nearest-neighbor search over embeddings
//! - `quality` - Scores sharpness for choosing between copies
//! - `comparator` - Groups duplicates from hash and embedding matches
//! - `pipeline` - Orchestrates the full workflow

pub mod comparator;
pub mod config;
pub mod decode;
pub mod embedder;
pub mod hasher;
pub mod index;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod resize;
pub mod scanner;
pub mod store;

// Re-export commonly used types
pub use comparator::{DuplicateGroup, MatchMethod};
pub use config::EngineConfig;
pub use hasher::{HashAlgorithmKind, PerceptualHash};
pub use pipeline::{CancellationToken, Pipeline, ScanReport};
pub use record::{Identity, ImageRecord, RecordStatus};
