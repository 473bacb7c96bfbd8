//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use provenance_kernel::KernelError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Kernel(e) => match e {
                KernelError::InvalidShares { .. } | KernelError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                KernelError::NotFound(_) => StatusCode::NOT_FOUND,
                KernelError::TransientLog(_) => StatusCode::SERVICE_UNAVAILABLE,
                KernelError::Reassembly(_)
                | KernelError::Codec(_)
                | KernelError::Log(_)
                | KernelError::Core(_)
                | KernelError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
