use crate::error::AnalysisError;
use crate::extract::extract_receipt_fields;
use crate::ocr::ReceiptRecognizer;
use crate::summary::format_raw_result;
use crate::types::AnalyzeReceiptResponse;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<dyn ReceiptRecognizer>,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Everything `POST /analyze-receipt` can answer with instead of a result.
#[derive(Debug)]
pub enum ApiError {
    NoFileUploaded,
    NoFileSelected,
    /// The multipart body could not be read (malformed, too large, ...).
    Upload(MultipartError),
    Analysis(AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoFileUploaded => (StatusCode::BAD_REQUEST, "No file uploaded".to_string()),
            ApiError::NoFileSelected => (StatusCode::BAD_REQUEST, "No file selected".to_string()),
            ApiError::Upload(e) => (e.status(), e.body_text()),
            ApiError::Analysis(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// `GET /health`
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: "Document Intelligence API",
    })
}

/// `POST /analyze-receipt`: analyze the uploaded `file` part with the prebuilt receipt model.
pub async fn analyze_receipt(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeReceiptResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Request is not a multipart upload: {}", rejection);
        ApiError::NoFileUploaded
    })?;
    let (file_name, document) = read_file_part(&mut multipart).await?;
    info!("Analyzing {} ({} bytes)", file_name, document.len());

    let result = state
        .recognizer
        .analyze_receipt(document)
        .await
        .map_err(|e| {
            error!("Receipt analysis failed for {}: {}", file_name, e);
            ApiError::Analysis(e)
        })?;

    let data = extract_receipt_fields(&result);
    debug!("Extracted {} receipt(s) from {}", data.len(), file_name);
    Ok(Json(AnalyzeReceiptResponse {
        success: true,
        data,
        raw_result: format_raw_result(&result),
    }))
}

/// Find the `file` part and read it whole. A `file` part without a
/// `filename` parameter is a plain form field, not an upload.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(ApiError::Upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = match field.file_name() {
            None => continue,
            Some("") => return Err(ApiError::NoFileSelected),
            Some(name) => name.to_string(),
        };
        let document = field.bytes().await.map_err(ApiError::Upload)?;
        return Ok((file_name, document));
    }
    Err(ApiError::NoFileUploaded)
}
