use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use partyplanner_api::{ApiError, ServiceError};

/// Unified API error type.
///
/// Produces `{"error": "<message>"}` JSON responses.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    message: String,
}

impl ApiErr {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServiceError> for ApiErr {
    fn from(err: ServiceError) -> Self {
        if let ServiceError::Internal(detail) = &err {
            tracing::error!("{detail}");
            return Self::internal("internal server error");
        }
        Self {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.message().to_string(),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiError {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_status_and_message() {
        let err = ApiErr::from(ServiceError::Conflict("invitation already exists".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.message(), "invitation already exists");
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ApiErr::from(ServiceError::Internal("insert party: disk I/O error".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "internal server error");
    }
}
