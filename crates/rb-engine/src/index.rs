//! The Segment Index: ordered record of the segments currently in the store.
//!
//! [`SegmentList`] is the plain data structure with synchronous operations
//! (scan here, retention/selection/resolution in their own modules).
//! [`SegmentIndex`] puts one list behind a single async reader/writer lock and
//! pairs it with the store it mirrors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, RwLockReadGuard};

use rb_core::segment::{canonical_file_name, parse_canonical_timestamp};
use rb_core::Segment;

use crate::retention::{RetentionLimits, RetentionReport};
use crate::store::SegmentStore;

/// Outcome of one scan of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub renamed: usize,
    pub rename_failures: usize,
    pub stat_failures: usize,
    /// The directory listing failed and the index was left untouched.
    pub listing_failed: bool,
}

/// Point-in-time aggregate view of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub segment_count: usize,
    pub total_size: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Segments sorted by non-decreasing start time, unique by path.
#[derive(Debug, Clone, Default)]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size).sum()
    }

    pub fn oldest(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn newest(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.segments.iter().any(|s| s.path == path)
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            segment_count: self.len(),
            total_size: self.total_size(),
            oldest: self.oldest().map(|s| s.start_time),
            newest: self.newest().map(|s| s.start_time),
        }
    }

    pub(crate) fn segments_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    /// Discover new files in `store` and add them to the list.
    ///
    /// Files already indexed (exact path match) are skipped. A new file's start
    /// time comes from its canonical name, or else from its modification time
    /// truncated to whole seconds, in which case the file is renamed to the
    /// canonical name. The rename is skipped when that name is already taken
    /// on disk or in the index, and a failed rename leaves the file indexed
    /// under its original name.
    pub fn scan(&mut self, store: &dyn SegmentStore, nominal_duration: Duration) -> ScanReport {
        let mut report = ScanReport::default();

        let candidates = match store.list() {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!(
                    dir = %store.dir().display(),
                    "Failed to list segment directory: {e}"
                );
                report.listing_failed = true;
                return report;
            }
        };

        let mut known: HashSet<PathBuf> = self.segments.iter().map(|s| s.path.clone()).collect();

        for path in candidates {
            if known.contains(&path) {
                continue;
            }

            let meta = match store.metadata(&path) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to stat segment: {e}");
                    report.stat_failures += 1;
                    continue;
                }
            };

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let (start_time, path) = match parse_canonical_timestamp(&file_name) {
                Some(start) => (start, path),
                None => {
                    let start = truncate_to_secs(meta.modified);
                    let target = store.dir().join(canonical_file_name(start));
                    let path = if known.contains(&target) || store.exists(&target) {
                        tracing::debug!(
                            path = %path.display(),
                            target = %target.display(),
                            "Canonical name already taken; keeping original name"
                        );
                        path
                    } else {
                        match store.rename(&path, &target) {
                            Ok(()) => {
                                report.renamed += 1;
                                target
                            }
                            Err(e) => {
                                tracing::warn!(
                                    path = %path.display(),
                                    target = %target.display(),
                                    "Failed to rename segment: {e}"
                                );
                                report.rename_failures += 1;
                                path
                            }
                        }
                    };
                    (start, path)
                }
            };

            tracing::debug!(
                path = %path.display(),
                start = %start_time.to_rfc3339(),
                size = meta.size,
                "Indexed segment"
            );

            known.insert(path.clone());
            self.segments.push(Segment {
                path,
                start_time,
                size: meta.size,
                nominal_duration,
            });
            report.added += 1;
        }

        if report.added > 0 {
            // Stable: equal start times keep discovery order.
            self.segments.sort_by_key(|s| s.start_time);
        }

        report
    }
}

fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

/// The shared, lock-protected index.
///
/// Scans and retention take the write lock; queries hold a read guard for
/// as long as they use the segments they picked, so retention cannot delete a
/// file that is being concatenated or decoded.
#[derive(Debug)]
pub struct SegmentIndex {
    list: RwLock<SegmentList>,
    store: Arc<dyn SegmentStore>,
    nominal_duration: Duration,
}

impl SegmentIndex {
    pub fn new(store: Arc<dyn SegmentStore>, nominal_duration: Duration) -> Self {
        Self {
            list: RwLock::new(SegmentList::new()),
            store,
            nominal_duration,
        }
    }

    pub fn store(&self) -> &Arc<dyn SegmentStore> {
        &self.store
    }

    pub fn nominal_duration(&self) -> Duration {
        self.nominal_duration
    }

    /// Shared access for queries.
    pub async fn read(&self) -> RwLockReadGuard<'_, SegmentList> {
        self.list.read().await
    }

    pub async fn scan(&self) -> ScanReport {
        let mut list = self.list.write().await;
        list.scan(self.store.as_ref(), self.nominal_duration)
    }

    pub async fn enforce(&self, now: DateTime<Utc>, limits: RetentionLimits) -> RetentionReport {
        let mut list = self.list.write().await;
        list.enforce(now, limits, self.store.as_ref())
    }

    pub async fn summary(&self) -> IndexSummary {
        self.list.read().await.summary()
    }
}
