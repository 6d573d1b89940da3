use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid CSRF token")]
    InvalidCsrfToken,

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error details handed from a failed handler or stage to the error page stage.
///
/// Travels as a response extension so the page can be rendered with the
/// session's authentication flag, which `IntoResponse` has no access to.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub intended_status: StatusCode,
}

impl AppError {
    /// The status this error would map to if statuses were honoured.
    ///
    /// Only logged; every error is answered with 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::UnexpectedField(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            message: self.to_string(),
            intended_status: self.status_code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        response.extensions_mut().insert(self.report());
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_collapses_to_500() {
        let errors = vec![
            AppError::NotFound("product".to_string()),
            AppError::Unauthorized,
            AppError::InvalidCsrfToken,
            AppError::Internal("boom".to_string()),
        ];

        for error in errors {
            let intended = error.status_code();
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let report = response.extensions().get::<ErrorReport>().unwrap();
            assert_eq!(report.intended_status, intended);
        }
    }

    #[test]
    fn test_intended_status_codes() {
        assert_eq!(
            AppError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::InvalidCsrfToken.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::UnexpectedField("avatar".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
