//! # SpectraMatch
//!
//! Incremental duplicate and near-duplicate image detection.
//!
//! ## How It Works
//! - **Exact and near-exact** matches come from perceptual hashes compared
//!   by Hamming distance
//! - **Semantic** matches come from embedding vectors compared by cosine
//!   distance through a nearest-neighbor index
//! - **Incremental** state lives in a versioned record store, so rescanning a
//!   large, slowly-changing library only touches what changed
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - The duplicate detection engine
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Error taxonomy
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DedupError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
