//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], a [`RingBuffer`] over an in-memory segment store,
//! a manual clock and recording fake media backends. The [`with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use rb_av::{Assembler, CaptureBackend, CaptureExit, CaptureSpec, FrameExtractor, ToolRegistry};
use rb_core::config::Config;
use rb_core::ManualClock;
use rb_engine::{BufferDeps, MemoryStore, RingBuffer};
use rb_server::context::AppContext;
use rb_server::router::build_router;

/// Wall-clock start of every harness, in Unix seconds.
pub const T0: i64 = 1_700_000_000;
pub const MB: u64 = 1024 * 1024;

/// Capture that idles until cancelled.
pub struct IdleCapture;

#[async_trait]
impl CaptureBackend for IdleCapture {
    async fn run(
        &self,
        _spec: &CaptureSpec,
        cancel: CancellationToken,
    ) -> rb_core::Result<CaptureExit> {
        cancel.cancelled().await;
        Ok(CaptureExit::Cancelled)
    }
}

/// Records concat calls; optionally fails every call.
#[derive(Default)]
pub struct RecordingAssembler {
    pub calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
    pub fail: bool,
}

#[async_trait]
impl Assembler for RecordingAssembler {
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> rb_core::Result<()> {
        if self.fail {
            return Err(rb_core::Error::tool(
                "ffmpeg",
                "exited with status 1: concat.txt: Invalid data found",
            ));
        }
        self.calls
            .lock()
            .push((inputs.to_vec(), output.to_path_buf()));
        Ok(())
    }
}

/// Records extraction calls and never fails.
#[derive(Default)]
pub struct RecordingExtractor {
    pub calls: Mutex<Vec<(PathBuf, f64, PathBuf)>>,
}

#[async_trait]
impl FrameExtractor for RecordingExtractor {
    async fn extract_frame(
        &self,
        segment: &Path,
        offset_secs: f64,
        output: &Path,
    ) -> rb_core::Result<()> {
        self.calls
            .lock()
            .push((segment.to_path_buf(), offset_secs, output.to_path_buf()));
        Ok(())
    }
}

/// Test harness wrapping a [`RingBuffer`] with fake collaborators.
pub struct TestHarness {
    pub ctx: AppContext,
    pub buffer: Arc<RingBuffer>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub assembler: Arc<RecordingAssembler>,
    pub extractor: Arc<RecordingExtractor>,
    pub tmp: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_assembler(RecordingAssembler::default())
    }

    pub fn with_assembler(assembler: RecordingAssembler) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let dir = tmp.path().join("segments");
        std::fs::create_dir_all(&dir).expect("failed to create segment dir");

        let mut config = Config::default();
        config.capture.rtsp_url = "rtsp://camera.local/stream1".into();
        config.buffer.dir = dir.clone();

        let store = Arc::new(MemoryStore::new(&dir));
        let clock = Arc::new(ManualClock::at_unix(T0));
        let assembler = Arc::new(assembler);
        let extractor = Arc::new(RecordingExtractor::default());

        let deps = BufferDeps {
            store: store.clone(),
            clock: clock.clone(),
            capture: Arc::new(IdleCapture),
            assembler: assembler.clone(),
            extractor: extractor.clone(),
        };
        let buffer = Arc::new(RingBuffer::new(config, deps));
        let ctx = AppContext::new(buffer.clone(), Arc::new(ToolRegistry::default()));

        Self {
            ctx,
            buffer,
            store,
            clock,
            assembler,
            extractor,
            tmp,
        }
    }

    /// Add `count` canonical segments 5 s apart starting at `start` and index
    /// them.
    pub async fn seed(&self, start: i64, count: i64, size: u64) {
        for i in 0..count {
            let t = start + i * 5;
            self.store.insert(
                &format!("segment_{t}.mp4"),
                size,
                DateTime::from_timestamp(t, 0).expect("valid timestamp"),
            );
        }
        self.buffer.index().scan().await;
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    pub async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}
