//! Buffer status.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use rb_engine::BufferStatus;

use crate::context::AppContext;

/// Buffer status response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// One of `stopped`, `starting`, `running`, `stopping`.
    pub state: String,
    pub running: bool,
    pub segment_count: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    /// Start of the newest segment minus start of the oldest.
    pub buffer_seconds: f64,
    /// Segment count times the nominal segment length.
    pub covered_seconds: f64,
    /// RFC 3339; null when the buffer is empty.
    pub oldest_segment: Option<String>,
    pub newest_segment: Option<String>,
    pub capture_restarts: u64,
    pub segment_secs: u64,
    pub max_age_secs: u64,
    pub max_size_bytes: u64,
}

fn rfc3339(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl From<BufferStatus> for StatusResponse {
    fn from(s: BufferStatus) -> Self {
        Self {
            state: s.state.to_string(),
            running: s.running,
            segment_count: s.segment_count,
            total_size_bytes: s.total_size_bytes,
            total_size_mb: s.total_size_mb,
            buffer_seconds: s.buffer_seconds,
            covered_seconds: s.covered_seconds,
            oldest_segment: rfc3339(s.oldest_segment),
            newest_segment: rfc3339(s.newest_segment),
            capture_restarts: s.capture_restarts,
            segment_secs: s.segment_secs,
            max_age_secs: s.max_age_secs,
            max_size_bytes: s.max_size_bytes,
        }
    }
}

/// GET /status
#[utoipa::path(
    get,
    path = "/status",
    responses((status = 200, description = "Current buffer status", body = StatusResponse))
)]
pub async fn get_status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(ctx.buffer.status().await.into())
}
