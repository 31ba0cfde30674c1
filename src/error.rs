use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::scheduling::SchedulingError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Scheduling(err) => match err {
                SchedulingError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
                SchedulingError::ProviderUnavailable(_) => {
                    (StatusCode::BAD_REQUEST, "Provider is not available")
                }
                SchedulingError::SlotConflict => {
                    (StatusCode::CONFLICT, "This time slot is already booked")
                }
                SchedulingError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
                SchedulingError::InvalidTransition { .. } => (
                    StatusCode::CONFLICT,
                    "Appointment is not in a state that allows this action",
                ),
                SchedulingError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
                }
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
