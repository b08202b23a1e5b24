//! Periodic background loops: store scanning and retention.
//!
//! Each loop runs until its cancellation token fires and exits within one
//! polling interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use rb_core::Clock;

use crate::index::SegmentIndex;
use crate::retention::RetentionLimits;

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Rescan the store every `period`.
pub async fn run_scanner(index: Arc<SegmentIndex>, period: Duration, cancel: CancellationToken) {
    tracing::info!("Segment scanner started");
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let report = index.scan().await;
        if report.added > 0 {
            tracing::debug!(
                added = report.added,
                renamed = report.renamed,
                "Discovered new segments"
            );
        }
    }

    tracing::info!("Segment scanner stopped");
}

/// Apply the retention limits every `period`.
pub async fn run_retention(
    index: Arc<SegmentIndex>,
    clock: Arc<dyn Clock>,
    limits: RetentionLimits,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        max_age_secs = limits.max_age.as_secs(),
        max_size = limits.max_size,
        "Retention enforcer started"
    );
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let report = index.enforce(clock.now(), limits).await;
        if report.removed() > 0 {
            tracing::info!(
                expired = report.expired,
                evicted_for_size = report.evicted_for_size,
                bytes_freed = report.bytes_freed,
                "Retention pass removed segments"
            );
        }
    }

    tracing::info!("Retention enforcer stopped");
}
