// HTTP request handlers
use crate::application::device_view::{DeviceView, LiveMode, ViewSnapshot};
use crate::domain::axis::ChartAnnotation;
use crate::domain::export::ExportArtifact;
use crate::domain::error::TelemetryError;
use crate::domain::time_range::{RangeSelection, TimeRange};
use crate::infrastructure::chunked_stream::{ndjson_response, snapshot_stream};
use crate::infrastructure::http_response::{accepts_brotli, artifact_response};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct LiveRequest {
    #[serde(default)]
    pub mode: Option<LiveMode>,
}

#[derive(Debug, Deserialize)]
pub struct KeysRequest {
    #[serde(default)]
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct TelemetryResponse {
    #[serde(flatten)]
    pub snapshot: Arc<ViewSnapshot>,
    pub charts: Vec<ChartAnnotation>,
}

#[derive(Debug, Serialize)]
pub struct RangeResponse {
    pub range: TimeRange,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub live: bool,
    pub changed: bool,
}

fn require_view(state: &AppState, device_id: &str) -> Result<Arc<DeviceView>, ApiError> {
    state
        .view(device_id)
        .ok_or_else(|| ApiError::view_not_open(device_id))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn create_view(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Arc<ViewSnapshot>>, ApiError> {
    let view = state.open_view(&id).await?;
    Ok(Json(view.snapshot()))
}

pub async fn delete_view(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    if state.close_view(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::view_not_open(&id))
    }
}

pub async fn set_range(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(selection): Json<RangeSelection>,
) -> Result<Json<RangeResponse>, ApiError> {
    let view = require_view(&state, &id)?;
    let range = view.set_range(selection)?;
    Ok(Json(RangeResponse { range }))
}

pub async fn set_keys(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<KeysRequest>,
) -> Result<Json<KeysResponse>, ApiError> {
    let view = require_view(&state, &id)?;
    view.set_keys(request.keys);
    Ok(Json(KeysResponse { keys: view.keys() }))
}

pub async fn fetch(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Arc<ViewSnapshot>>, ApiError> {
    let view = require_view(&state, &id)?;
    let snapshot = view.fetch_history().await?;
    Ok(Json(snapshot))
}

pub async fn telemetry(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TelemetryResponse>, ApiError> {
    let view = require_view(&state, &id)?;
    Ok(Json(TelemetryResponse {
        snapshot: view.snapshot(),
        charts: view.chart(),
    }))
}

pub async fn start_live(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    request: Option<Json<LiveRequest>>,
) -> Result<Json<LiveResponse>, ApiError> {
    let view = require_view(&state, &id)?;
    let mode = request
        .and_then(|Json(r)| r.mode)
        .unwrap_or(state.live_mode);
    let changed = view.start_live(mode);
    Ok(Json(LiveResponse {
        live: view.is_live(),
        changed,
    }))
}

pub async fn stop_live(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LiveResponse>, ApiError> {
    let view = require_view(&state, &id)?;
    let changed = view.stop_live();
    Ok(Json(LiveResponse {
        live: view.is_live(),
        changed,
    }))
}

/// Stream snapshots of a view as newline-delimited JSON
pub async fn live_stream(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let view = require_view(&state, &id)?;
    let stream = snapshot_stream(view.subscribe());
    Ok(ndjson_response(stream)?)
}

async fn download(
    artifact: Result<Option<ExportArtifact>, TelemetryError>,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    match artifact? {
        Some(artifact) => Ok(artifact_response(artifact, accepts_brotli(headers)).await?),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn export_csv(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let view = require_view(&state, &id)?;
    download(view.export_csv(), &headers).await
}

pub async fn export_pdf(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let view = require_view(&state, &id)?;
    download(view.export_pdf(), &headers).await
}
