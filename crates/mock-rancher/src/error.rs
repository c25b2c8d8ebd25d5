//! Error responses of the mock server.
//!
//! [`MockError`] implements [`IntoResponse`] so handlers can return
//! `Result<…, MockError>` directly.  Bodies follow the management API's
//! error shape (`{"status":…,"code":…,"message":…}`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use devtool_models::{ApiErrorBody, ModelError};

/// Failure modes of the mock endpoints.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Missing or unknown credentials.
    #[error("must authenticate")]
    Unauthorized,

    /// The addressed resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The request body names something that cannot be used.
    #[error("{0}")]
    InvalidReference(String),

    /// A resource with the same name already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The login challenge could not be used.
    #[error("invalid login challenge: {0}")]
    Challenge(#[from] ModelError),
}

impl MockError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            Self::InvalidReference(_) => (StatusCode::UNPROCESSABLE_ENTITY, "InvalidReference"),
            Self::AlreadyExists(_) => (StatusCode::CONFLICT, "AlreadyExists"),
            Self::Challenge(_) => (StatusCode::BAD_REQUEST, "InvalidBodyContent"),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        tracing::debug!(%status, error = %self, "request rejected");
        let body = ApiErrorBody {
            status: status.as_u16(),
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
