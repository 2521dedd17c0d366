/*
 * Responsibility
 * - Application-wide error type
 * - IntoResponse (HTTP status / JSON error body) for handlers
 * - Conversion from grant, authorization, token and config errors
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use grants::{AuthzError, GrantError};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::auth::jwt::TokenError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::Config(_) | AppError::Internal => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Configuration details stay in the logs.
        let message = match &self {
            AppError::Config(_) => AppError::Internal.to_string(),
            _ => self.to_string(),
        };

        let body = ErrorResponseBody {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<GrantError> for AppError {
    fn from(e: GrantError) -> Self {
        match e {
            GrantError::UnknownGrant(_) => AppError::InvalidRequest(e.to_string()),
            GrantError::TooManyCustomGrants { .. } | GrantError::InvalidCustomGrantName(_) => {
                AppError::Config(e.to_string())
            }
        }
    }
}

impl From<AuthzError> for AppError {
    fn from(e: AuthzError) -> Self {
        match e {
            AuthzError::ClaimMissing => AppError::Unauthorized,
            AuthzError::ClaimParse(inner) => AppError::InvalidRequest(inner.to_string()),
            AuthzError::GrantMismatch { .. } => AppError::Forbidden,
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Verification(_) | TokenError::InvalidSubject => AppError::Unauthorized,
            TokenError::InvalidKey(_) | TokenError::Signing(_) => AppError::Internal,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
