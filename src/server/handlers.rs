use super::types::{ErrorResponse, HealthResponse};
use crate::{
    Error,
    analysis::AnalysisResult,
    error::ErrorKind,
    pipeline::Pipeline,
    upload::UploadForm,
};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

/// Pipeline failure rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingInput | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::AnalysisTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::StageWriteError
        | ErrorKind::AnalysisFailed
        | ErrorKind::DecodeError
        | ErrorKind::SchemaError
        | ErrorKind::Config
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: kind.as_str(),
        };
        (status_for(kind), Json(body)).into_response()
    }
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Rejected upload body: {}", rejection.body_text());
        Error::invalid_input(format!(
            "Expected a multipart form: {}",
            rejection.body_text()
        ))
    })?;

    let form = read_form(multipart, state.max_upload_bytes).await?;
    info!(
        "Received upload: file={:?}, target_savings present={}",
        form.file_name,
        form.target_savings.is_some()
    );

    let result = state.pipeline.handle(form).await?;
    Ok(Json(result))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Buffers the form so nothing is staged until every part has been seen.
async fn read_form(mut multipart: Multipart, limit_bytes: usize) -> Result<UploadForm, Error> {
    let mut form = UploadForm::default();
    let malformed = |e| multipart_error(e, limit_bytes);

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                form.file_name = field.file_name().map(str::to_string);
                form.file_bytes = Some(field.bytes().await.map_err(malformed)?);
            }
            Some("target_savings") => {
                form.target_savings = Some(field.text().await.map_err(malformed)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, limit_bytes: usize) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload exceeded the {} byte limit", limit_bytes);
        return Error::PayloadTooLarge { limit_bytes };
    }
    Error::invalid_input(format!("Malformed multipart body: {}", e.body_text()))
}
