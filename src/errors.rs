use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown field: {0}")]
    InvalidField(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("no completed bookings for {0}")]
    NoCompletedBookings(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Store(_) | AppError::Database(_) | AppError::UpstreamUnavailable(_) => {
                "upstream_unavailable"
            }
            AppError::Validation(_) => "validation",
            AppError::InvalidField(_) => "invalid_field",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::NoCompletedBookings(_) => "no_completed_bookings",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized => "unauthorized",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) | AppError::Database(_) | AppError::UpstreamUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Validation(_) | AppError::InvalidField(_) | AppError::InvalidStatus(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) | AppError::NoCompletedBookings(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}
