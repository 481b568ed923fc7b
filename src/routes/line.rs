use axum::{Json, extract::State};
use serde::Deserialize;

use crate::{app::AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<&'static str, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }
    state
        .notifier
        .send_message(&request.message)
        .await
        .map_err(|err| ApiError::upstream("send LINE notification", err))?;
    Ok("OK")
}
