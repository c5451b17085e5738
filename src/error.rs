/*
 * Responsibility
 * - Gateway-wide AppError
 * - IntoResponse (HTTP status / JSON error body)
 * - 403 carries the required roles so callers can see what they are missing
 */
use axum::{
    Json,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("Insufficient permissions. Required roles: [{}]", .required_roles.join(", "))]
    Forbidden { required_roles: Vec<String> },
    #[error("no route for {method} {path}")]
    NoRoute { method: Method, path: String },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn forbidden(required_roles: impl Into<Vec<String>>) -> Self {
        Self::Forbidden {
            required_roles: required_roles.into(),
        }
    }

    pub fn no_route(method: Method, path: impl Into<String>) -> Self {
        Self::NoRoute {
            method,
            path: path.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code, required_roles) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Forbidden { required_roles } => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", Some(required_roles))
            }
            AppError::NoRoute { .. } => (StatusCode::NOT_FOUND, "NO_ROUTE", None),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message,
                required_roles,
            },
        };

        (status, Json(body)).into_response()
    }
}
