//! HTTP surface of the narration service

use crate::service::TtsService;
use crate::{MAX_TEXT_LENGTH, SERVICE_NAME};
use axum::extract::{Host, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct TtsParams {
    #[serde(default)]
    text: Option<String>,
    lang: Option<String>,
    #[serde(default)]
    slow: bool,
    #[serde(default)]
    stream: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: f64,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"success": false, "error": message.into()})),
    )
        .into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
    })
}

async fn tts_get(
    State(service): State<Arc<TtsService>>,
    Host(host): Host,
    Query(params): Query<TtsParams>,
) -> Response {
    synthesize(&service, &host, params, false).await
}

async fn tts_post(
    State(service): State<Arc<TtsService>>,
    Host(host): Host,
    Json(params): Json<TtsParams>,
) -> Response {
    synthesize(&service, &host, params, false).await
}

/// Direct streaming endpoint: always returns the audio body.
async fn tts_stream(
    State(service): State<Arc<TtsService>>,
    Host(host): Host,
    Json(params): Json<TtsParams>,
) -> Response {
    synthesize(&service, &host, params, true).await
}

async fn synthesize(
    service: &TtsService,
    host: &str,
    params: TtsParams,
    force_stream: bool,
) -> Response {
    service.run_periodic_cleanup();

    let text = params.text.unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Text parameter is required");
    }
    let char_count = text.chars().count();
    if char_count > MAX_TEXT_LENGTH {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Text too long. Maximum {MAX_TEXT_LENGTH} characters allowed."),
        );
    }

    let lang = params.lang.unwrap_or_else(|| "id".to_string());
    let audio_path = match service.generate(&text, &lang, params.slow, true).await {
        Ok(path) => path,
        Err(e) => {
            warn!(target: "server", "Synthesis failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate audio");
        }
    };

    if force_stream || params.stream {
        return stream_file(&audio_path).await;
    }

    let filename = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Json(json!({
        "success": true,
        "audio_url": format!("http://{host}/audio/{filename}"),
        "audio_path": audio_path.to_string_lossy(),
        "text_length": char_count,
        "lang": lang,
    }))
    .into_response()
}

async fn serve_audio(
    State(service): State<Arc<TtsService>>,
    Path(filename): Path<String>,
) -> Response {
    match service.resolve_audio(&filename) {
        Some(path) => stream_file(&path).await,
        None => error_response(StatusCode::NOT_FOUND, "Audio file not found"),
    }
}

async fn stream_file(path: &std::path::Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        Err(e) => {
            warn!(target: "server", "Failed to read {}: {}", path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Endpoint not found")
}

/// Build the service router.
pub fn router(service: Arc<TtsService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tts", get(tts_get).post(tts_post))
        .route("/tts/stream", post(tts_stream))
        .route("/audio/:filename", get(serve_audio))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
