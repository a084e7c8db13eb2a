//! # Events Module
//!
//! Event-driven progress and result reporting.
//!
//! ## Design
//! The engine emits events through channels, allowing any UI
//! (CLI, GUI, web) to subscribe and display progress. Dropping the
//! receiver never affects the engine.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Scan(ScanEvent::Progress(p)) = event {
//!             println!("{}/{} {}", p.processed, p.total, p.current_path.display());
//!         }
//!     }
//! });
//!
//! let pipeline = Pipeline::builder(config).events(sender).build()?;
//! pipeline.scan(&CancellationToken::new())?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub(crate) use channel::ProgressThrottle;
pub use types::*;
