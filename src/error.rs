use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::registration::RegistrationError;
use crate::session::AuthError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    InternalServerError,
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16() as i32,
            error_message,
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

// The sub-reason only ever reaches the logs.
impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        if e.is_internal() {
            tracing::error!(error = %e, "authentication failed internally");
            AppError::InternalServerError
        } else if e.is_upstream_outage() {
            tracing::error!(error = %e, "authentication upstream unavailable");
            AppError::Unauthorized
        } else {
            tracing::warn!(reason = %e, "authentication rejected");
            AppError::Unauthorized
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Invalid(msg) => AppError::BadRequest(msg.to_string()),
            other => {
                tracing::error!(error = %other, "registration failed");
                AppError::InternalServerError
            }
        }
    }
}
