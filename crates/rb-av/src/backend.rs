//! Backend traits the buffer engine drives.
//!
//! The engine never shells out directly. It hands a [`CaptureSpec`] to a
//! [`CaptureBackend`], selected segment paths to an [`Assembler`], and a
//! resolved `(segment, offset)` pair to a [`FrameExtractor`]. Production uses
//! the ffmpeg implementations in this crate; tests plug in fakes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Everything the capture process needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSpec {
    pub rtsp_url: String,
    pub dir: PathBuf,
    pub segment_duration: Duration,
    pub resolution: Option<String>,
}

/// How a capture session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureExit {
    /// The process exited on its own; carries its exit status text.
    Exited(String),
    /// The session was stopped through the cancellation token.
    Cancelled,
}

/// Long-running producer of segment files.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Run one capture session until the process exits or `cancel` fires.
    ///
    /// On cancellation the implementation must ask the process to terminate
    /// gracefully and wait a bounded time before forcing it down.
    async fn run(&self, spec: &CaptureSpec, cancel: CancellationToken)
        -> rb_core::Result<CaptureExit>;
}

/// Lossless concatenation of segment files into one clip.
#[async_trait]
pub trait Assembler: Send + Sync {
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> rb_core::Result<()>;
}

/// Still-image extraction from a single segment.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(
        &self,
        segment: &Path,
        offset_secs: f64,
        output: &Path,
    ) -> rb_core::Result<()>;
}
