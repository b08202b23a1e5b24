//! The ring buffer: lifecycle, status, and the save/frames queries.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rb_av::{
    Assembler, CaptureBackend, CaptureSpec, FfmpegAssembler, FfmpegCapture,
    FfmpegFrameExtractor, FrameExtractor, ToolRegistry,
};
use rb_core::config::Config;
use rb_core::{Clock, Error, Result, SystemClock};

use crate::index::SegmentIndex;
use crate::retention::RetentionLimits;
use crate::store::{FsStore, SegmentStore};
use crate::supervisor::CaptureSupervisor;
use crate::tasks;
use crate::window::WindowRequest;

/// Duration budget used by a save request that sets neither budget.
pub const DEFAULT_SAVE_DURATION: Duration = Duration::from_secs(30);

/// Lifecycle state of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for BufferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BufferState::Stopped => "stopped",
            BufferState::Starting => "starting",
            BufferState::Running => "running",
            BufferState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// The collaborators a buffer runs against.
#[derive(Clone)]
pub struct BufferDeps {
    pub store: Arc<dyn SegmentStore>,
    pub clock: Arc<dyn Clock>,
    pub capture: Arc<dyn CaptureBackend>,
    pub assembler: Arc<dyn Assembler>,
    pub extractor: Arc<dyn FrameExtractor>,
}

impl BufferDeps {
    /// Real directory, system clock and ffmpeg backends.
    pub fn production(config: &Config, tools: &ToolRegistry) -> Result<Self> {
        Ok(Self {
            store: Arc::new(FsStore::new(config.buffer.dir.clone())),
            clock: Arc::new(SystemClock),
            capture: Arc::new(FfmpegCapture::from_registry(
                tools,
                config.capture.stop_timeout(),
            )?),
            assembler: Arc::new(FfmpegAssembler::from_registry(tools)?),
            extractor: Arc::new(FfmpegFrameExtractor::from_registry(tools)?),
        })
    }
}

/// Snapshot returned by [`RingBuffer::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStatus {
    pub state: BufferState,
    pub running: bool,
    pub segment_count: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    /// Newest start minus oldest start.
    pub buffer_seconds: f64,
    /// Segment count times the nominal segment duration.
    pub covered_seconds: f64,
    pub oldest_segment: Option<DateTime<Utc>>,
    pub newest_segment: Option<DateTime<Utc>>,
    pub capture_restarts: u64,
    pub segment_secs: u64,
    pub max_age_secs: u64,
    pub max_size_bytes: u64,
}

/// Parameters of a save request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRequest {
    pub seconds: u64,
    pub size_mb: u64,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveResult {
    pub saved_path: PathBuf,
    pub segment_count: usize,
    pub size_bytes: u64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FramesResult {
    pub frames: Vec<PathBuf>,
    /// Requested offsets (seconds ago) that produced no frame.
    pub missed: Vec<f64>,
}

struct Activities {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// A time-bounded buffer of recently captured segments.
pub struct RingBuffer {
    config: Config,
    index: Arc<SegmentIndex>,
    deps: BufferDeps,
    state: Mutex<BufferState>,
    activities: Mutex<Option<Activities>>,
    restarts: Arc<AtomicU64>,
}

impl RingBuffer {
    pub fn new(config: Config, deps: BufferDeps) -> Self {
        let index = Arc::new(SegmentIndex::new(
            deps.store.clone(),
            config.buffer.segment_duration(),
        ));
        Self {
            config,
            index,
            deps,
            state: Mutex::new(BufferState::Stopped),
            activities: Mutex::new(None),
            restarts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &Arc<SegmentIndex> {
        &self.index
    }

    pub fn state(&self) -> BufferState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == BufferState::Running
    }

    fn limits(&self) -> RetentionLimits {
        RetentionLimits::from_config(&self.config.buffer)
    }

    /// Prepare the store, index what is already there, and start the scan,
    /// retention and capture activities.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != BufferState::Stopped {
                return Err(Error::Conflict("already running".into()));
            }
            *state = BufferState::Starting;
        }

        if let Err(e) = self.prepare() {
            *self.state.lock() = BufferState::Stopped;
            return Err(e);
        }

        let report = self.index.scan().await;
        tracing::info!(
            dir = %self.config.buffer.dir.display(),
            segments = report.added,
            "Initial scan complete"
        );

        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(3);

        handles.push(tokio::spawn(tasks::run_scanner(
            self.index.clone(),
            self.config.buffer.scan_interval(),
            cancel.clone(),
        )));

        handles.push(tokio::spawn(tasks::run_retention(
            self.index.clone(),
            self.deps.clock.clone(),
            self.limits(),
            self.config.buffer.retention_interval(),
            cancel.clone(),
        )));

        let spec = CaptureSpec {
            rtsp_url: self.config.capture.rtsp_url.clone(),
            dir: self.config.buffer.dir.clone(),
            segment_duration: self.config.buffer.segment_duration(),
            resolution: self.config.capture.resolution.clone(),
        };
        let supervisor = CaptureSupervisor::new(
            self.deps.capture.clone(),
            spec,
            self.config.capture.restart_backoff(),
        )
        .with_restart_counter(self.restarts.clone());
        handles.push(tokio::spawn(supervisor.run(cancel.clone())));

        *self.activities.lock() = Some(Activities { cancel, handles });
        *self.state.lock() = BufferState::Running;

        tracing::info!(
            segment_secs = self.config.buffer.segment_secs,
            max_age_mins = self.config.buffer.max_age_mins,
            max_size_mb = self.config.buffer.max_size_mb,
            "Ring buffer started"
        );
        Ok(())
    }

    fn prepare(&self) -> Result<()> {
        self.config.check()?;
        self.index.store().ensure_dir().map_err(|e| {
            Error::Config(format!(
                "cannot create buffer directory {}: {e}",
                self.config.buffer.dir.display()
            ))
        })
    }

    /// Cancel all activities and wait for them. A stopped buffer is left as is.
    pub async fn stop(&self) -> Result<()> {
        let activities = {
            let mut state = self.state.lock();
            match *state {
                BufferState::Stopped | BufferState::Stopping => return Ok(()),
                BufferState::Starting => {
                    return Err(Error::Conflict("buffer is still starting".into()))
                }
                BufferState::Running => *state = BufferState::Stopping,
            }
            self.activities.lock().take()
        };

        if let Some(Activities { cancel, handles }) = activities {
            cancel.cancel();
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Buffer task ended abnormally: {e}");
                }
            }
        }

        *self.state.lock() = BufferState::Stopped;
        tracing::info!("Ring buffer stopped");
        Ok(())
    }

    pub async fn status(&self) -> BufferStatus {
        let state = self.state();
        let summary = self.index.summary().await;
        let nominal = self.config.buffer.segment_duration();

        let buffer_seconds = match (summary.oldest, summary.newest) {
            (Some(oldest), Some(newest)) => (newest - oldest).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };

        BufferStatus {
            state,
            running: state == BufferState::Running,
            segment_count: summary.segment_count,
            total_size_bytes: summary.total_size,
            total_size_mb: summary.total_size as f64 / (1024.0 * 1024.0),
            buffer_seconds,
            covered_seconds: summary.segment_count as f64 * nominal.as_secs_f64(),
            oldest_segment: summary.oldest,
            newest_segment: summary.newest,
            capture_restarts: self.restarts.load(Ordering::Relaxed),
            segment_secs: self.config.buffer.segment_secs,
            max_age_secs: self.config.buffer.max_age().as_secs(),
            max_size_bytes: self.config.buffer.max_size_bytes(),
        }
    }

    /// Concatenate the newest segments that fit the request into one file.
    ///
    /// The index read guard is held until assembly finishes, so retention
    /// cannot delete a selected file mid-copy.
    pub async fn save_window(&self, req: SaveRequest) -> Result<SaveResult> {
        let max_duration = if req.seconds == 0 && req.size_mb == 0 {
            DEFAULT_SAVE_DURATION
        } else {
            Duration::from_secs(req.seconds)
        };
        let window_req = WindowRequest {
            max_duration,
            max_size: req.size_mb.saturating_mul(1024 * 1024),
            max_age: self.config.buffer.max_age(),
        };

        let list = self.index.read().await;
        if list.is_empty() {
            return Err(Error::NoSegments);
        }

        let now = self.deps.clock.now();
        let window = list
            .select_window(&window_req, now)
            .ok_or_else(|| Error::no_match("newest segment does not fit the requested budget"))?;

        let output = req
            .output
            .unwrap_or_else(|| default_save_path(&self.config.buffer.saved_dir(), now));
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.deps.assembler.concat(&window.paths(), &output).await?;
        drop(list);

        tracing::info!(
            path = %output.display(),
            segments = window.segments.len(),
            size = window.total_size,
            duration_secs = window.duration.as_secs(),
            "Saved buffer window"
        );

        Ok(SaveResult {
            saved_path: output,
            segment_count: window.segments.len(),
            size_bytes: window.total_size,
            duration_secs: window.duration.as_secs_f64(),
        })
    }

    /// Extract one still per requested "seconds ago" offset.
    ///
    /// Offsets that fall outside the buffered interval, or whose extraction
    /// fails, are reported in `missed` instead of failing the call.
    pub async fn extract_frames(
        &self,
        seconds_ago: &[f64],
        output_dir: Option<PathBuf>,
    ) -> Result<FramesResult> {
        let list = self.index.read().await;
        if list.is_empty() {
            return Err(Error::NoSegments);
        }

        let dir = output_dir.unwrap_or_else(|| self.config.buffer.frames_dir());
        tokio::fs::create_dir_all(&dir).await?;

        let now = self.deps.clock.now();
        let mut result = FramesResult::default();

        for (i, &secs) in seconds_ago.iter().enumerate() {
            let Some(target) = target_time(now, secs) else {
                tracing::debug!(seconds_ago = secs, "Requested offset is out of range");
                result.missed.push(secs);
                continue;
            };

            let Some(hit) = list.resolve(target) else {
                tracing::debug!(
                    seconds_ago = secs,
                    target = %target.to_rfc3339(),
                    "No segment covers requested time"
                );
                result.missed.push(secs);
                continue;
            };

            let output = dir.join(frame_file_name(i, secs));
            match self
                .deps
                .extractor
                .extract_frame(&hit.segment.path, hit.offset_secs, &output)
                .await
            {
                Ok(()) => {
                    tracing::debug!(
                        segment = %hit.segment.path.display(),
                        offset_secs = hit.offset_secs,
                        "Extracted frame"
                    );
                    result.frames.push(output);
                }
                Err(e) => {
                    tracing::warn!("Failed to extract frame at {secs:.1}s ago: {e}");
                    result.missed.push(secs);
                }
            }
        }

        Ok(result)
    }
}

/// The instant `secs` seconds before `now`, or `None` when it is not
/// representable.
fn target_time(now: DateTime<Utc>, secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    // Saturating cast; an out-of-range value is rejected by `try_milliseconds`.
    let delta = chrono::TimeDelta::try_milliseconds((secs * 1000.0).round() as i64)?;
    now.checked_sub_signed(delta)
}

/// `recording_<local YYYYmmdd_HHMMSS>.mp4` inside `dir`.
pub fn default_save_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.with_timezone(&Local).format("%Y%m%d_%H%M%S");
    dir.join(format!("recording_{stamp}.mp4"))
}

pub fn frame_file_name(index: usize, seconds_ago: f64) -> String {
    format!("frame_{index}_{seconds_ago:.1}s_ago.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names() {
        assert_eq!(frame_file_name(0, 0.0), "frame_0_0.0s_ago.jpg");
        assert_eq!(frame_file_name(2, 12.75), "frame_2_12.8s_ago.jpg");
    }

    #[test]
    fn save_path_shape() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let path = default_save_path(Path::new("/data/saved"), now);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(path.starts_with("/data/saved"));
        assert!(name.starts_with("recording_2023111"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(name.len(), "recording_20231114_221320.mp4".len());
    }

    #[test]
    fn target_time_rejects_out_of_range_offsets() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(
            target_time(now, 2.5),
            DateTime::from_timestamp_millis(1_699_999_997_500)
        );
        assert_eq!(target_time(now, f64::NAN), None);
        assert_eq!(target_time(now, 1e13), None);
        assert_eq!(target_time(now, -1e300), None);
        assert_eq!(target_time(now, f64::MAX), None);
    }

    #[test]
    fn state_display() {
        assert_eq!(BufferState::Running.to_string(), "running");
        assert_eq!(BufferState::Stopping.to_string(), "stopping");
    }
}
