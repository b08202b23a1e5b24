//! rb-core: shared error type, configuration, segment model, and clock.
//!
//! This crate is the foundational dependency for all other rb-* crates. It
//! owns the [`Segment`] record, the canonical segment file naming scheme, the
//! application [`config::Config`], and the [`Clock`] abstraction that lets
//! retention and lookup run against simulated time in tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod segment;

// Re-export the most commonly used items at the crate root.
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use segment::Segment;
