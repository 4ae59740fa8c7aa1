//! Request handlers and their error mapping.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docx_html_format::convert_document;
use tracing::{error, info, warn};

use crate::{AppState, ConvertResponse, ErrorResponse};

/// Multipart field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "docx";

#[derive(Debug)]
pub enum ApiError {
    /// The request did not carry a readable upload.
    BadRequest(String),
    /// Conversion or formatting failed.
    Conversion(docx_html_format::Error),
    Internal(String),
}

impl From<docx_html_format::Error> for ApiError {
    fn from(e: docx_html_format::Error) -> Self {
        ApiError::Conversion(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conversion(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            error!(%status, error = %message, "conversion failed");
        } else {
            warn!(%status, error = %message, "rejected upload");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("could not read upload: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {}", e.body_text())))?;
        return Ok(bytes.to_vec());
    }
    Err(ApiError::BadRequest(format!(
        "missing multipart field `{UPLOAD_FIELD}`"
    )))
}

/// `POST /api/convert`
pub async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let bytes = read_upload(&mut multipart).await?;
    info!(bytes = bytes.len(), "converting upload");

    let converter = state.converter.clone();
    let html = tokio::task::spawn_blocking(move || convert_document(converter.as_ref(), &bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("conversion task failed: {e}")))??;

    info!(html = html.len(), "converted upload");
    Ok(Json(ConvertResponse { html }))
}
