//! rb-engine: the segment index and everything that reads or prunes it.
//!
//! - [`store`]: the [`SegmentStore`] seam over the segment directory.
//! - [`index`]: [`SegmentIndex`], discovery and canonical renaming.
//! - [`retention`]: age and size eviction.
//! - [`window`]: trailing-window selection for saves.
//! - [`resolver`]: point-in-time lookup for frame extraction.
//! - [`tasks`] and [`supervisor`]: the background loops.
//! - [`buffer`]: [`RingBuffer`], which ties them into a start/stop lifecycle.

pub mod buffer;
pub mod index;
pub mod resolver;
pub mod retention;
pub mod store;
pub mod supervisor;
pub mod tasks;
pub mod window;

pub use buffer::{
    BufferDeps, BufferState, BufferStatus, FramesResult, RingBuffer, SaveRequest, SaveResult,
};
pub use index::{IndexSummary, ScanReport, SegmentIndex, SegmentList};
pub use resolver::Resolved;
pub use retention::{RetentionLimits, RetentionReport};
pub use store::{FileMeta, FsStore, MemoryStore, SegmentStore};
pub use supervisor::CaptureSupervisor;
pub use window::{Window, WindowRequest};
