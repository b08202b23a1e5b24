//! Axum router construction.

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::status::get_status,
        routes::save::save,
        routes::frames::get_frames,
        routes::tools::tools,
    ),
    components(schemas(
        routes::status::StatusResponse,
        routes::save::SaveResponse,
        routes::frames::FramesResponse,
        rb_av::ToolInfo,
    )),
    info(title = "ringbuffer", description = "Live video ring buffer control API")
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/status", get(routes::status::get_status))
        .route(
            "/save",
            get(routes::save::save).post(routes::save::save),
        )
        .route("/frames", get(routes::frames::get_frames))
        .route("/tools", get(routes::tools::tools))
        .route("/openapi.json", get(openapi))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
