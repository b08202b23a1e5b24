//! Still-frame extraction from a buffered segment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::FrameExtractor;
use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Frame extractor that seeks with `-ss` and writes a single JPEG.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg: PathBuf, timeout: Duration) -> Self {
        Self { ffmpeg, timeout }
    }

    pub fn from_registry(tools: &ToolRegistry) -> rb_core::Result<Self> {
        let cfg = tools.require("ffmpeg")?;
        Ok(Self::new(cfg.path.clone(), cfg.timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// ffmpeg arguments for pulling one frame at `offset_secs` into `segment`.
pub fn extract_args(segment: &Path, offset_secs: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        format!("{offset_secs:.2}"),
        "-i".into(),
        segment.to_string_lossy().into_owned(),
        "-vframes".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        output.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(
        &self,
        segment: &Path,
        offset_secs: f64,
        output: &Path,
    ) -> rb_core::Result<()> {
        ToolCommand::new(self.ffmpeg.clone())
            .timeout(self.timeout)
            .args(extract_args(segment, offset_secs, output))
            .execute()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_offset_has_two_decimals() {
        let args = extract_args(
            Path::new("/buf/segment_1700000000.mp4"),
            2.345,
            Path::new("/frames/frame_0_0.0s_ago.jpg"),
        );
        assert_eq!(
            args.join(" "),
            "-y -ss 2.35 -i /buf/segment_1700000000.mp4 -vframes 1 -q:v 2 /frames/frame_0_0.0s_ago.jpg"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_is_surfaced() {
        let extractor = FfmpegFrameExtractor::new(PathBuf::from("false"), Duration::from_secs(5));
        let result = extractor
            .extract_frame(Path::new("/buf/x.mp4"), 0.0, Path::new("/tmp/x.jpg"))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn registry_timeout_is_carried() {
        let tools = ToolRegistry::default()
            .with_tool("ffmpeg", "/opt/ffmpeg/bin/ffmpeg")
            .with_timeout("ffmpeg", Duration::from_secs(15));
        let extractor = FfmpegFrameExtractor::from_registry(&tools).unwrap();
        assert_eq!(extractor.timeout(), Duration::from_secs(15));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_tool_is_cut_off() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nexec sleep 10\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let extractor = FfmpegFrameExtractor::new(script, Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = extractor
            .extract_frame(Path::new("/buf/x.mp4"), 0.0, Path::new("/tmp/x.jpg"))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
