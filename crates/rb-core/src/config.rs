//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the HTTP server, the segment buffer, the capture process,
//! and external tools. Every section defaults sensibly so a completely empty
//! `{}` file is valid; only the stream URL has no usable default and must come
//! from the file or the command line.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub buffer: BufferConfig,
    pub capture: CaptureConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Strict loading: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.buffer.scan_interval_secs > self.buffer.segment_secs {
            warnings.push(format!(
                "buffer.scan_interval_secs ({}) is longer than a segment ({}s); \
                 the newest segments will be discovered late",
                self.buffer.scan_interval_secs, self.buffer.segment_secs
            ));
        }

        let min_age = self.buffer.segment_secs.saturating_mul(2);
        if self.buffer.max_age_mins.saturating_mul(60) < min_age {
            warnings.push(format!(
                "buffer.max_age_mins ({}) keeps fewer than two segments",
                self.buffer.max_age_mins
            ));
        }

        if let Some(ref res) = self.capture.resolution {
            if parse_resolution(res).is_none() {
                warnings.push(format!(
                    "capture.resolution '{res}' is not WIDTHxHEIGHT; ffmpeg may reject it"
                ));
            }
        }

        warnings
    }

    /// Return the first fatal problem that prevents the buffer from starting.
    pub fn check(&self) -> Result<()> {
        if self.capture.rtsp_url.trim().is_empty() {
            return Err(Error::Config(
                "capture.rtsp_url is required (use --rtsp)".into(),
            ));
        }
        if self.buffer.segment_secs == 0 {
            return Err(Error::Config("buffer.segment_secs must be positive".into()));
        }
        if self.buffer.max_age_mins == 0 {
            return Err(Error::Config("buffer.max_age_mins must be positive".into()));
        }
        if self.buffer.max_size_mb == 0 {
            return Err(Error::Config("buffer.max_size_mb must be positive".into()));
        }
        if self.buffer.scan_interval_secs == 0 || self.buffer.retention_interval_secs == 0 {
            return Err(Error::Config("buffer polling intervals must be positive".into()));
        }
        Ok(())
    }
}

/// Split `1280x720` into `(1280, 720)`.
pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8085,
        }
    }
}

/// Segment store and retention limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub dir: PathBuf,
    pub segment_secs: u64,
    pub max_age_mins: u64,
    pub max_size_mb: u64,
    pub scan_interval_secs: u64,
    pub retention_interval_secs: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/ringbuffer/segments"),
            segment_secs: 5,
            max_age_mins: 30,
            max_size_mb: 500,
            scan_interval_secs: 1,
            retention_interval_secs: 5,
        }
    }
}

impl BufferConfig {
    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_mins.saturating_mul(60))
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs)
    }

    /// Sibling directory of the store used for saved clips.
    pub fn saved_dir(&self) -> PathBuf {
        self.dir.join("..").join("saved")
    }

    /// Sibling directory of the store used for extracted frames.
    pub fn frames_dir(&self) -> PathBuf {
        self.dir.join("..").join("frames")
    }
}

/// Live capture process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub rtsp_url: String,
    /// Output resolution such as `1280x720`; `None` keeps the source stream
    /// untouched (no re-encode).
    pub resolution: Option<String>,
    pub restart_backoff_secs: u64,
    pub stop_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            rtsp_url: String::new(),
            resolution: None,
            restart_backoff_secs: 5,
            stop_timeout_secs: 10,
        }
    }
}

impl CaptureConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_secs(self.restart_backoff_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Upper bound for one-shot tool runs (concat, frame grabs).
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
