//! Retention Policy: age and size eviction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rb_core::Segment;

use crate::index::SegmentList;
use crate::store::SegmentStore;

/// Bounds the buffer is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    pub max_age: Duration,
    pub max_size: u64,
}

impl RetentionLimits {
    pub fn from_config(cfg: &rb_core::config::BufferConfig) -> Self {
        Self {
            max_age: cfg.max_age(),
            max_size: cfg.max_size_bytes(),
        }
    }
}

/// Outcome of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    pub expired: usize,
    pub evicted_for_size: usize,
    pub bytes_freed: u64,
    pub delete_failures: usize,
}

impl RetentionReport {
    pub fn removed(&self) -> usize {
        self.expired + self.evicted_for_size
    }
}

impl SegmentList {
    /// Drop segments older than `max_age`, then drop oldest segments until the
    /// total size fits in `max_size`.
    ///
    /// Backing files are deleted as entries go. A failed delete is counted and
    /// logged, and the entry is dropped from the list anyway.
    pub fn enforce(
        &mut self,
        now: DateTime<Utc>,
        limits: RetentionLimits,
        store: &dyn SegmentStore,
    ) -> RetentionReport {
        let mut report = RetentionReport::default();
        let segments = self.segments_mut();

        let (expired, kept): (Vec<Segment>, Vec<Segment>) = std::mem::take(segments)
            .into_iter()
            .partition(|s| s.age_at(now) > limits.max_age);
        *segments = kept;

        for seg in &expired {
            tracing::info!(
                path = %seg.path.display(),
                age_secs = seg.age_at(now).as_secs(),
                "Removed expired segment"
            );
            delete(store, seg, &mut report);
            report.expired += 1;
        }

        let mut total: u64 = segments.iter().map(|s| s.size).sum();
        let mut evict = 0;
        while total > limits.max_size && evict < segments.len() {
            total -= segments[evict].size;
            evict += 1;
        }

        for seg in segments.drain(..evict) {
            tracing::info!(
                path = %seg.path.display(),
                size = seg.size,
                "Removed segment for size limit"
            );
            delete(store, &seg, &mut report);
            report.evicted_for_size += 1;
        }

        report
    }
}

fn delete(store: &dyn SegmentStore, seg: &Segment, report: &mut RetentionReport) {
    match store.remove(&seg.path) {
        Ok(()) => report.bytes_freed += seg.size,
        Err(e) => {
            tracing::warn!(path = %seg.path.display(), "Failed to delete segment: {e}");
            report.delete_failures += 1;
        }
    }
}
