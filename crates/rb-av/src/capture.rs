//! Live stream capture into fixed-length segment files.
//!
//! ffmpeg's segment muxer writes `segment_%05d.mp4` files into the store
//! directory; the engine renames them to their canonical timestamp form as
//! it discovers them.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::backend::{CaptureBackend, CaptureExit, CaptureSpec};
use crate::tools::ToolRegistry;

/// Capture backend that runs ffmpeg against an RTSP source.
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    ffmpeg: PathBuf,
    stop_timeout: Duration,
}

impl FfmpegCapture {
    pub fn new(ffmpeg: PathBuf, stop_timeout: Duration) -> Self {
        Self {
            ffmpeg,
            stop_timeout,
        }
    }

    pub fn from_registry(tools: &ToolRegistry, stop_timeout: Duration) -> rb_core::Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::new(ffmpeg.path.clone(), stop_timeout))
    }

    /// SIGTERM, then a bounded wait, then SIGKILL.
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                tracing::warn!("Failed to send SIGTERM to capture process {pid}: {e}");
            }
        }

        #[cfg(not(unix))]
        if let Err(e) = child.start_kill() {
            tracing::warn!("Failed to stop capture process: {e}");
        }

        match tokio::time::timeout(self.stop_timeout, child.wait()).await {
            Ok(Ok(status)) => tracing::info!("Capture process stopped ({status})"),
            Ok(Err(e)) => tracing::warn!("Failed waiting for capture process: {e}"),
            Err(_) => {
                tracing::warn!(
                    "Capture process did not exit within {:?}; killing",
                    self.stop_timeout
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill capture process: {e}");
                }
            }
        }
    }
}

/// Build the ffmpeg argument list for a capture session.
///
/// Without a resolution the video stream is copied as-is; with one it is
/// scaled and re-encoded with libx264. Audio is always dropped because the
/// camera's PCM audio cannot be muxed into mp4.
pub fn capture_args(spec: &CaptureSpec) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-rtsp_transport".into(),
        "tcp".into(),
        "-i".into(),
        spec.rtsp_url.clone(),
    ];

    match spec.resolution.as_deref() {
        Some(res) => args.extend([
            "-vf".to_string(),
            format!("scale={res}"),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "ultrafast".into(),
        ]),
        None => args.extend(["-c:v".to_string(), "copy".into()]),
    }

    args.extend([
        "-an".to_string(),
        "-f".into(),
        "segment".into(),
        "-segment_time".into(),
        spec.segment_duration.as_secs().max(1).to_string(),
        "-segment_format".into(),
        rb_core::segment::SEGMENT_EXTENSION.into(),
        "-reset_timestamps".into(),
        "1".into(),
        spec.dir
            .join(rb_core::segment::capture_pattern())
            .to_string_lossy()
            .into_owned(),
    ]);

    args
}

#[async_trait]
impl CaptureBackend for FfmpegCapture {
    async fn run(
        &self,
        spec: &CaptureSpec,
        cancel: CancellationToken,
    ) -> rb_core::Result<CaptureExit> {
        let args = capture_args(spec);
        tracing::info!("Starting ffmpeg: {} {}", self.ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| rb_core::Error::tool("ffmpeg", format!("failed to spawn: {e}")))?;

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        match exited {
            Some(Ok(status)) => Ok(CaptureExit::Exited(status.to_string())),
            Some(Err(e)) => Err(rb_core::Error::tool(
                "ffmpeg",
                format!("I/O error waiting for process: {e}"),
            )),
            None => {
                self.terminate(&mut child).await;
                Ok(CaptureExit::Cancelled)
            }
        }
    }
}
