//! Recorded segment model and the on-disk naming scheme.
//!
//! The capture process writes `segment_00042.mp4`-style sequence names. Once
//! discovered, a segment is renamed to `segment_<unix seconds>.mp4`, and that
//! canonical name is the only durable record of when it started: the index is
//! always rebuilt from filenames after a restart.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Filename prefix shared by capture output and canonical names.
pub const SEGMENT_PREFIX: &str = "segment_";

/// Container extension of segment files.
pub const SEGMENT_EXTENSION: &str = "mp4";

/// Stems at or below this value are sequence numbers, not timestamps.
pub const MIN_CANONICAL_TIMESTAMP: i64 = 1_000_000_000;

/// One closed, immutable recorded file in the segment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub path: PathBuf,
    pub start_time: DateTime<Utc>,
    /// Bytes on disk when the segment was discovered.
    pub size: u64,
    pub nominal_duration: Duration,
}

impl Segment {
    /// Exclusive end of the segment's nominal interval.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + to_delta(self.nominal_duration)
    }

    /// Whether `t` falls inside `[start_time, end_time)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start_time && t < self.end_time()
    }

    /// Age relative to `now`; segments stamped in the future have age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Convert a std duration into a chrono delta, saturating at zero on overflow.
pub fn to_delta(d: Duration) -> chrono::TimeDelta {
    chrono::TimeDelta::from_std(d).unwrap_or(chrono::TimeDelta::zero())
}

/// The part of a segment filename between prefix and extension.
pub fn segment_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_EXTENSION)?
        .strip_suffix('.')
        .filter(|stem| !stem.is_empty())
}

/// Whether a filename looks like capture output or a canonical segment.
pub fn is_segment_file_name(file_name: &str) -> bool {
    segment_stem(file_name).is_some()
}

/// Parse the start time out of a canonical `segment_<unix>.mp4` name.
///
/// Returns `None` for sequence-numbered capture output and anything else that
/// is not a plausible Unix timestamp.
pub fn parse_canonical_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = segment_stem(file_name)?.parse().ok()?;
    if secs <= MIN_CANONICAL_TIMESTAMP {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// Canonical filename for a segment starting at `start`.
pub fn canonical_file_name(start: DateTime<Utc>) -> String {
    format!("{SEGMENT_PREFIX}{}.{SEGMENT_EXTENSION}", start.timestamp())
}

/// Output pattern handed to the ffmpeg segment muxer.
pub fn capture_pattern() -> String {
    format!("{SEGMENT_PREFIX}%05d.{SEGMENT_EXTENSION}")
}
