use crate::{error::AppError, render::render_detections, state::AppState};
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    routing::get,
};
use inference::InferenceBackend;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    pub url: Option<String>,
}

pub fn router<B: InferenceBackend + 'static>(state: AppState<B>) -> Router {
    let body_limit = state.fetcher.max_image_bytes();

    Router::new()
        .route("/detect", get(detect_url::<B>).post(detect_upload::<B>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Detect objects in a remote image, `?url=` or the configured default.
async fn detect_url<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<DetectQuery>,
) -> Result<String, AppError> {
    let url = query.url.as_deref().unwrap_or(&state.default_image_url);
    let image = state.fetcher.fetch(url).await?;
    run_detection(&state, image).await
}

/// Detect objects in the uploaded request body.
async fn detect_upload<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    body: Bytes,
) -> Result<String, AppError> {
    if body.is_empty() {
        return Err(AppError::EmptyBody);
    }
    run_detection(&state, body.to_vec()).await
}

async fn run_detection<B: InferenceBackend>(
    state: &AppState<B>,
    image: Vec<u8>,
) -> Result<String, AppError> {
    let detections = state.service.detect(image).await?;
    Ok(render_detections(&detections)?)
}
