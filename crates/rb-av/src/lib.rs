//! # rb-av
//!
//! External media tooling for the ring buffer.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Backend traits** ([`CaptureBackend`], [`Assembler`],
//!   [`FrameExtractor`]) -- the seams the buffer engine talks through, so it
//!   can be exercised without ffmpeg installed.
//! - **ffmpeg backends** ([`FfmpegCapture`], [`FfmpegAssembler`],
//!   [`FfmpegFrameExtractor`]) -- live segment capture, lossless
//!   concatenation, and still-frame extraction.

pub mod assemble;
pub mod backend;
pub mod capture;
pub mod command;
pub mod extract;
pub mod tools;

// ---- Re-exports for convenience ----

pub use assemble::FfmpegAssembler;
pub use backend::{Assembler, CaptureBackend, CaptureExit, CaptureSpec, FrameExtractor};
pub use capture::FfmpegCapture;
pub use command::{ToolCommand, ToolOutput};
pub use extract::FfmpegFrameExtractor;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
