// Archivo: error.rs
// Propósito: errores HTTP del servidor y su traducción a respuestas JSON
// `{ code, message }`.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lifecycle::LifecycleError;
use serde::Serialize;
use thiserror::Error;
use vet_domain::DomainError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Lifecycle(e.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Lifecycle(e) => match e {
                LifecycleError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LifecycleError::ConflictingTransition { .. } => StatusCode::CONFLICT,
                LifecycleError::SlotTaken(_) => StatusCode::CONFLICT,
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
                LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(ErrorBody { code: status.as_u16(),
                                    message: self.to_string() });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vet_domain::AppointmentStatus;

    #[test]
    fn lifecycle_errors_map_to_http_statuses() {
        let cases = [(LifecycleError::InvalidTransition { from: AppointmentStatus::Scheduled,
                                                          to: AppointmentStatus::Completed },
                      422),
                     (LifecycleError::ConflictingTransition { expected: AppointmentStatus::Scheduled,
                                                              actual: AppointmentStatus::Confirmed },
                      409),
                     (LifecycleError::NotFound("x".into()), 404),
                     (LifecycleError::Storage("x".into()), 503),
                     (LifecycleError::Validation("x".into()), 400),
                     (LifecycleError::SlotTaken("x".into()), 409)];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).status().as_u16(), code);
        }
    }
}
