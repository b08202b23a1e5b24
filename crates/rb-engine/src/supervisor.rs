//! Capture supervision: keep the capture process running until stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rb_av::{CaptureBackend, CaptureExit, CaptureSpec};

/// Restarts the capture backend after a backoff whenever it ends on its own.
pub struct CaptureSupervisor {
    backend: Arc<dyn CaptureBackend>,
    spec: CaptureSpec,
    backoff: Duration,
    restarts: Arc<AtomicU64>,
}

impl CaptureSupervisor {
    pub fn new(backend: Arc<dyn CaptureBackend>, spec: CaptureSpec, backoff: Duration) -> Self {
        Self {
            backend,
            spec,
            backoff,
            restarts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share an existing restart counter (e.g. one the status view reads).
    pub fn with_restart_counter(mut self, restarts: Arc<AtomicU64>) -> Self {
        self.restarts = restarts;
        self
    }

    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(url = %self.spec.rtsp_url, "Capture supervisor started");

        loop {
            match self.backend.run(&self.spec, cancel.clone()).await {
                Ok(CaptureExit::Cancelled) => break,
                Ok(CaptureExit::Exited(status)) => {
                    tracing::warn!("Capture process exited unexpectedly ({status})");
                }
                Err(e) => tracing::error!("Capture process failed: {e}"),
            }

            if cancel.is_cancelled() {
                break;
            }

            tracing::info!(
                backoff_secs = self.backoff.as_secs(),
                "Restarting capture after backoff"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.backoff) => {}
                _ = cancel.cancelled() => break,
            }
            self.restarts.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!("Capture supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use tokio::time::Instant;

    /// Exits immediately a fixed number of times, then runs until cancelled.
    struct FlakyCapture {
        failures_left: Mutex<u32>,
        starts: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl CaptureBackend for FlakyCapture {
        async fn run(
            &self,
            _spec: &CaptureSpec,
            cancel: CancellationToken,
        ) -> rb_core::Result<CaptureExit> {
            self.starts.lock().push(Instant::now());
            {
                let mut left = self.failures_left.lock();
                if *left > 0 {
                    *left -= 1;
                    return Err(rb_core::Error::tool("ffmpeg", "connection refused"));
                }
            }
            cancel.cancelled().await;
            Ok(CaptureExit::Cancelled)
        }
    }

    fn spec() -> CaptureSpec {
        CaptureSpec {
            rtsp_url: "rtsp://cam/stream".into(),
            dir: PathBuf::from("/buf"),
            segment_duration: Duration::from_secs(5),
            resolution: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_after_backoff() {
        let backend = Arc::new(FlakyCapture {
            failures_left: Mutex::new(2),
            starts: Mutex::new(Vec::new()),
        });
        let supervisor =
            CaptureSupervisor::new(backend.clone(), spec(), Duration::from_secs(5));
        let restarts = supervisor.restarts.clone();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervisor.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(11)).await;
        let starts = backend.starts.lock().clone();
        assert_eq!(starts.len(), 3);
        assert!(starts[1] - starts[0] >= Duration::from_secs(5));
        assert_eq!(restarts.load(Ordering::Relaxed), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_exits() {
        let backend = Arc::new(FlakyCapture {
            failures_left: Mutex::new(100),
            starts: Mutex::new(Vec::new()),
        });
        let supervisor = CaptureSupervisor::new(backend.clone(), spec(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervisor.run(cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(backend.starts.lock().len(), 1);
    }
}
