use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::analysis::{AnalysisResult, ImageInput};
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

const UPLOAD_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub token: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze",
            post(analyze).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/result/{token}", get(result))
}

/// Multipart form: one or more `files`, optional `account_description`
///
/// POST /analyze
async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<AnalysisResponse>> {
    let mut images = Vec::new();
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed upload: {}", e)))?
    {
        match field.name().unwrap_or_default().to_string().as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read '{}': {}", file_name, e)))?;
                images.push(ImageInput::new(bytes.to_vec(), mime));
            }
            "account_description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("cannot read description: {}", e)))?;
                description = Some(text);
            }
            other => tracing::debug!("[Server] Ignoring upload field '{}'", other),
        }
    }

    let services = &state.services;
    let result = services
        .analysis
        .analyze(&images, description.as_deref())
        .await?;
    let token = services.results.store(&result).await?;

    Ok(Json(AnalysisResponse { result, token }))
}

/// GET /result/{token}
async fn result(State(state): State<AppState>, Path(token): Path<String>) -> ApiResult<Json<AnalysisResponse>> {
    let result = state.services.results.fetch(&token).await?;
    Ok(Json(AnalysisResponse { result, token }))
}
