use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all depot endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = usize::try_from(state.config.max_upload_bytes).unwrap_or(usize::MAX);
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/collections/:collection/files", get(handler::list_files))
        .route(
            "/v1/collections/:collection/files/*path",
            get(handler::download_file).put(handler::upload_file),
        )
        .route("/v1/releases", get(handler::list_releases))
        .route("/v1/releases/latest", get(handler::latest_release))
        .route("/v1/releases/:version", axum::routing::put(handler::publish_release))
        .route(
            "/v1/releases/:version/notes",
            get(handler::get_release_notes).put(handler::set_release_notes),
        )
        .route("/v1/releases/:version/download", get(handler::download_release))
        .route("/v1/updates", get(handler::check_update))
        // Uploads are streamed, not buffered; the limit below is the only cap.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
