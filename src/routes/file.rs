use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    app::AppState,
    error::ApiError,
    store::{Dimensions, OBJECT_CACHE_CONTROL},
};

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Base64 file contents.
    #[serde(default)]
    pub body: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub key: String,
}

pub async fn upload_file(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    let dimensions = Dimensions::from_optional(request.width.as_deref(), request.height.as_deref());
    let payload = request.body.unwrap_or_default();
    let key = state.store.put(&payload, dimensions.as_ref()).await?;
    Ok(Json(UploadResponse { key }))
}

pub async fn view_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let blob = state
        .store
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: format!("object {key}"),
        })?;
    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CACHE_CONTROL, OBJECT_CACHE_CONTROL.to_string()),
        ],
        blob.data,
    )
        .into_response())
}
