//! Still frames from points inside the buffer.

use std::path::PathBuf;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use rb_engine::FramesResult;

use crate::context::AppContext;
use crate::error::AppError;

/// Offsets used when the request names none.
pub const DEFAULT_SECONDS_AGO: &str = "0,5,10";

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FramesParams {
    /// Comma-separated offsets in seconds before now, e.g. `0,5,12.5`.
    pub seconds_ago: Option<String>,
    /// Output directory; defaults to `<buffer dir>/../frames`.
    pub output_dir: Option<String>,
}

/// Parse a comma-separated offset list, dropping items that are not finite
/// numbers.
pub fn parse_seconds_ago(list: &str) -> Vec<f64> {
    list.split(',')
        .filter_map(|item| item.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Frames response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FramesResponse {
    pub frames: Vec<String>,
    /// Offsets (seconds ago) that produced no frame.
    pub missed: Vec<f64>,
}

impl From<FramesResult> for FramesResponse {
    fn from(r: FramesResult) -> Self {
        Self {
            frames: r
                .frames
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            missed: r.missed,
        }
    }
}

/// GET /frames
#[utoipa::path(
    get,
    path = "/frames",
    params(FramesParams),
    responses(
        (status = 200, description = "Extracted frames", body = FramesResponse),
        (status = 404, description = "Buffer is empty")
    )
)]
pub async fn get_frames(
    State(ctx): State<AppContext>,
    params: Result<Query<FramesParams>, QueryRejection>,
) -> Result<Json<FramesResponse>, AppError> {
    let Query(params) = params?;

    let list = params
        .seconds_ago
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SECONDS_AGO);
    let seconds_ago = parse_seconds_ago(list);
    let output_dir = params
        .output_dir
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let result = ctx.buffer.extract_frames(&seconds_ago, output_dir).await?;
    Ok(Json(result.into()))
}
