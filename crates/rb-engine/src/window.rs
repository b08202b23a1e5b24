//! Window Selector: the trailing run of segments that fits a budget.

use std::time::Duration;

use chrono::{DateTime, Utc};

use rb_core::Segment;

use crate::index::SegmentList;

/// Budget for a trailing window. Zero disables the duration or size bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub max_duration: Duration,
    pub max_size: u64,
    /// Segments older than this are never included.
    pub max_age: Duration,
}

/// A contiguous run of segments in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub segments: Vec<Segment>,
    pub total_size: u64,
    /// Sum of nominal durations.
    pub duration: Duration,
}

impl Window {
    pub fn paths(&self) -> Vec<std::path::PathBuf> {
        self.segments.iter().map(|s| s.path.clone()).collect()
    }
}

impl SegmentList {
    /// Walk from the newest segment backwards, taking segments while the
    /// accumulated duration and size stay within budget and the candidate is
    /// not older than `max_age`.
    ///
    /// The walk stops at the first segment that breaks a bound, even if an
    /// older one would fit; the result is always contiguous up to the newest
    /// segment. `None` when the list is empty or the newest segment alone
    /// breaks a bound.
    pub fn select_window(&self, req: &WindowRequest, now: DateTime<Utc>) -> Option<Window> {
        let mut duration = Duration::ZERO;
        let mut total_size: u64 = 0;
        let mut taken = 0;

        for seg in self.segments().iter().rev() {
            let next_duration = duration + seg.nominal_duration;
            if !req.max_duration.is_zero() && next_duration > req.max_duration {
                break;
            }
            let next_size = total_size.saturating_add(seg.size);
            if req.max_size > 0 && next_size > req.max_size {
                break;
            }
            if seg.age_at(now) > req.max_age {
                break;
            }
            duration = next_duration;
            total_size = next_size;
            taken += 1;
        }

        if taken == 0 {
            return None;
        }

        let start = self.len() - taken;
        Some(Window {
            segments: self.segments()[start..].to_vec(),
            total_size,
            duration,
        })
    }
}
