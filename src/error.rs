use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures raised by the content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("body is required")]
    EmptyPayload,

    #[error("body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Backend I/O failure. Never caused by the caller's input.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("encoded credentials are not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("encoded credentials are not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Object store or notification service failure.
    #[error("failed to {operation}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    pub fn upstream(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Upstream {
            operation,
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(source) => ApiError::upstream("access object store", source),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Upstream { operation, source } = &self {
            tracing::error!(error = ?source, "failed to {operation}");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_input_errors_are_client_errors() {
        let err: ApiError = StoreError::EmptyPayload.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = StoreError::InvalidBase64(base64::DecodeError::InvalidLength(5)).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn backend_failures_do_not_leak_details() {
        let err: ApiError = StoreError::Backend(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "failed to access object store");
    }

    #[test]
    fn rate_limit_is_distinct_from_other_errors() {
        assert_eq!(
            ApiError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::NotFound {
                resource: "object".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
