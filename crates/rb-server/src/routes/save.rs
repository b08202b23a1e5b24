//! Save a trailing window of the buffer to a single file.

use std::path::PathBuf;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use rb_engine::{SaveRequest, SaveResult};

use crate::context::AppContext;
use crate::error::AppError;

/// Query parameters for a save. Both budgets unset means 30 seconds.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaveParams {
    /// Maximum clip length in seconds.
    pub seconds: Option<u64>,
    /// Maximum clip size in MiB.
    pub size_mb: Option<u64>,
    /// Output file; defaults to `<buffer dir>/../saved/recording_<time>.mp4`.
    pub output: Option<String>,
}

impl From<SaveParams> for SaveRequest {
    fn from(p: SaveParams) -> Self {
        Self {
            seconds: p.seconds.unwrap_or(0),
            size_mb: p.size_mb.unwrap_or(0),
            output: p.output.filter(|s| !s.is_empty()).map(PathBuf::from),
        }
    }
}

/// Save response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SaveResponse {
    pub saved_path: String,
    pub segment_count: usize,
    pub size_bytes: u64,
    pub duration_secs: f64,
}

impl From<SaveResult> for SaveResponse {
    fn from(r: SaveResult) -> Self {
        Self {
            saved_path: r.saved_path.to_string_lossy().into_owned(),
            segment_count: r.segment_count,
            size_bytes: r.size_bytes,
            duration_secs: r.duration_secs,
        }
    }
}

/// GET|POST /save
#[utoipa::path(
    post,
    path = "/save",
    params(SaveParams),
    responses(
        (status = 200, description = "Clip written", body = SaveResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 404, description = "No segments, or none fit the budget"),
        (status = 502, description = "Concatenation failed")
    )
)]
pub async fn save(
    State(ctx): State<AppContext>,
    params: Result<Query<SaveParams>, QueryRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Query(params) = params?;
    let result = ctx.buffer.save_window(params.into()).await?;
    Ok(Json(result.into()))
}
