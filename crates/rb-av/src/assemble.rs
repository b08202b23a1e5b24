//! Lossless concatenation of buffered segments into a single clip.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::Assembler;
use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Assembler backed by ffmpeg's concat demuxer (`-c copy`, no re-encode).
#[derive(Debug, Clone)]
pub struct FfmpegAssembler {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegAssembler {
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

/// Render the concat demuxer list: one `file '<path>'` line per input.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            // A quote inside a quoted entry is written as '\''.
            let escaped = p.to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

#[async_trait]
impl Assembler for FfmpegAssembler {
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> rb_core::Result<()> {
        if inputs.is_empty() {
            return Err(rb_core::Error::Validation(
                "nothing to concatenate".into(),
            ));
        }

        let mut list = tempfile::Builder::new()
            .prefix("concat_")
            .suffix(".txt")
            .tempfile()?;
        list.write_all(concat_list(inputs).as_bytes())?;
        list.flush()?;

        tracing::debug!(
            "concatenating {} segments into {}",
            inputs.len(),
            output.display()
        );

        ToolCommand::new(self.ffmpeg.clone())
            .timeout(self.timeout)
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(list.path().to_string_lossy().as_ref())
            .args(["-c", "copy"])
            .arg(output.to_string_lossy().as_ref())
            .execute()
            .await?;

        // The list file is removed when `list` drops.
        Ok(())
    }
}
