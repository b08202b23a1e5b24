//! Time-to-Segment Resolver.

use chrono::{DateTime, Utc};

use rb_core::Segment;

use crate::index::SegmentList;

/// The segment covering a point in time and the offset into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub segment: Segment,
    pub offset_secs: f64,
}

impl SegmentList {
    /// Find the first segment whose `[start, start + nominal)` interval holds
    /// `target`. A target on a boundary resolves to the later segment.
    pub fn resolve(&self, target: DateTime<Utc>) -> Option<Resolved> {
        let segment = self.segments().iter().find(|s| s.contains(target))?;
        // Non-negative: `contains` guarantees start <= target.
        let offset = (target - segment.start_time).to_std().ok()?;
        Some(Resolved {
            segment: segment.clone(),
            offset_secs: offset.as_secs_f64(),
        })
    }
}
