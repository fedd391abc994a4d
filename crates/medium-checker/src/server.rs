/// HTTP surface for the analysis pipeline.
///
/// Routes:
/// - `POST /analyze`: fetch, analyze and score one article
/// - `GET /health`: component status, including the model backend probe
/// - `GET /history`: most recent formatted results
/// - `POST /clear-history`
/// - `POST /quick-check`: host validation only, no network calls
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use checker_common::fetch::PageFetcher;
use checker_common::ollama::OllamaClient;

use crate::error::AnalysisError;
use crate::format::format_for_display;
use crate::history::{AnalysisHistory, RECENT_LIMIT};
use crate::pipeline::AnalysisPipeline;

pub type Pipeline = AnalysisPipeline<PageFetcher, OllamaClient>;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub history: Arc<AnalysisHistory>,
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    #[serde(default)]
    url: String,
}

type JsonResponse = (StatusCode, Json<Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .route("/history", get(history))
        .route("/clear-history", post(clear_history))
        .route("/quick-check", post(quick_check))
        .fallback(not_found)
        .with_state(state)
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> JsonResponse {
    let url = match requested_url(payload) {
        Ok(url) => url,
        Err(message) => return client_error(message),
    };

    info!(url = %url, "analysis requested");
    match state.pipeline.analyze(&url).await {
        Ok(result) => {
            let formatted = format_for_display(&result);
            state.history.push(formatted.clone()).await;
            (StatusCode::OK, Json(json!({ "success": true, "data": formatted })))
        }
        Err(e) => {
            warn!(url = %url, kind = e.kind(), error = %e, "analysis failed");
            failure_response(&e)
        }
    }
}

async fn health(State(state): State<AppState>) -> JsonResponse {
    let ollama = state.pipeline.model_available().await;
    let redis = state.pipeline.cache_available().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "components": {
                "scraper": true,
                "analyzer": true,
                "ollama": ollama,
                "redis": redis,
            },
            "timestamp": chrono::Local::now().to_rfc3339(),
        })),
    )
}

async fn history(State(state): State<AppState>) -> JsonResponse {
    let entries = state.history.recent(RECENT_LIMIT).await;
    (StatusCode::OK, Json(json!({ "success": true, "data": entries })))
}

async fn clear_history(State(state): State<AppState>) -> JsonResponse {
    state.history.clear().await;
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "analysis history cleared" })),
    )
}

async fn quick_check(
    State(state): State<AppState>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Json<Value> {
    let extractor = state.pipeline.extractor();
    let body = match requested_url(payload) {
        Ok(url) => {
            let valid = extractor.is_valid_url(&url);
            let reason = if valid {
                format!("valid {} url", extractor.target_domain())
            } else {
                format!("not a {} url", extractor.target_domain())
            };
            json!({ "valid": valid, "reason": reason })
        }
        Err(message) => json!({ "valid": false, "reason": message }),
    };
    Json(body)
}

async fn not_found() -> JsonResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "endpoint not found" })))
}

fn requested_url(payload: Result<Json<UrlRequest>, JsonRejection>) -> Result<String, String> {
    let Json(request) = payload.map_err(|e| format!("url is required ({e})"))?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err("url is required".to_string());
    }
    Ok(url.to_string())
}

fn client_error(message: String) -> JsonResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message })),
    )
}

/// Extraction-stage failures are the caller's problem (400); everything after is ours (500).
fn failure_response(err: &AnalysisError) -> JsonResponse {
    if err.is_extraction_failure() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "kind": err.kind(),
                "error": format!("Scraping error: {err}"),
            })),
        );
    }

    let mut body = json!({
        "success": false,
        "kind": err.kind(),
        "error": format!("Analysis error: {err}"),
    });
    if let Some(raw) = err.raw_response() {
        body["raw_response"] = Value::String(raw.to_string());
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::DecodeError;
    use checker_common::error::CommonError;

    #[test]
    fn test_requested_url_trims_and_rejects_blank() {
        let ok = requested_url(Ok(Json(UrlRequest {
            url: "  https://medium.com/a  ".to_string(),
        })));
        assert_eq!(ok.unwrap(), "https://medium.com/a");

        let blank = requested_url(Ok(Json(UrlRequest { url: "   ".to_string() })));
        assert!(blank.is_err());
    }

    #[test]
    fn test_extraction_failures_are_client_errors() {
        let (status, Json(body)) = failure_response(&AnalysisError::ExtractionEmpty);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "extraction_empty");
        assert!(body["error"].as_str().unwrap().starts_with("Scraping error:"));
    }

    #[test]
    fn test_decode_failures_include_raw_response() {
        let err = AnalysisError::Decode {
            source: DecodeError::JsonDecode {
                message: "expected value".to_string(),
                context: "{oops".to_string(),
            },
            raw_response: "{oops".to_string(),
        };
        let (status, Json(body)) = failure_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "json_decode");
        assert_eq!(body["raw_response"], "{oops");
    }

    #[test]
    fn test_model_failures_are_server_errors() {
        let err = AnalysisError::Common(CommonError::ModelBackend { status: 502 });
        let (status, Json(body)) = failure_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("raw_response").is_none());
    }
}
