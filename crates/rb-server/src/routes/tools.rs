//! External tool availability.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;

/// GET /tools
#[utoipa::path(
    get,
    path = "/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<rb_av::ToolInfo>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Json<Vec<rb_av::ToolInfo>> {
    Json(ctx.tools.check_all())
}
