// Router assembly
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_view, delete_view, export_csv, export_pdf, fetch, health_check, live_stream, set_keys,
    set_range, start_live, stop_live, telemetry,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Downloads are compressed in the handlers and the live stream must not be
// buffered, so no CompressionLayer here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/devices/:id/view", post(create_view).delete(delete_view))
        .route("/devices/:id/range", put(set_range))
        .route("/devices/:id/keys", put(set_keys))
        .route("/devices/:id/fetch", post(fetch))
        .route("/devices/:id/telemetry", get(telemetry))
        .route("/devices/:id/live", post(start_live).delete(stop_live))
        .route("/devices/:id/live/stream", get(live_stream))
        .route("/devices/:id/export/csv", get(export_csv))
        .route("/devices/:id/export/pdf", get(export_pdf))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
