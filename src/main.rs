//! # spectramatch CLI
//!
//! Command-line interface for the duplicate image engine.
//!
//! ## Usage
//! ```bash
//! spectramatch scan ~/Photos --hash-threshold 8
//! spectramatch groups --embedding-threshold 0.15 --output json
//! ```

mod cli;

use spectramatch::Result;

fn main() -> Result<()> {
    spectramatch::init_tracing();
    cli::run()
}
