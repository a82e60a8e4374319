use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jitgate_core::AppError;
use serde::Serialize;

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_)
            | AppError::Conflict(_)
            | AppError::ConflictExhausted { .. } => StatusCode::CONFLICT,
            AppError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = Json(ErrorResponse {
            message: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_http_statuses() {
        assert_eq!(
            ApiError(AppError::Validation("bad".to_owned())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(AppError::ExternalService {
                status: Some(503),
                message: "down".to_owned(),
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(AppError::Configuration("no snapshot".to_owned())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
