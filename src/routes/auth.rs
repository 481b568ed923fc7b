use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{app::AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct EncodeKeyRequest {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeKeyResponse {
    pub encoded_credentials: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCredentialsRequest {
    pub encoded_credentials: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCredentialsResponse {
    pub verified: bool,
}

pub async fn encode_key(
    State(state): State<AppState>,
    Json(request): Json<EncodeKeyRequest>,
) -> Json<EncodeKeyResponse> {
    Json(EncodeKeyResponse {
        encoded_credentials: state.credentials.encode(&request.key),
    })
}

/// 200 with `verified: true` on a match, 401 with `verified: false` otherwise.
pub async fn verify_credentials(
    State(state): State<AppState>,
    Json(request): Json<VerifyCredentialsRequest>,
) -> Result<Response, ApiError> {
    let verified = state.credentials.verify(&request.encoded_credentials)?;
    let status = if verified {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((status, Json(VerifyCredentialsResponse { verified })).into_response())
}
