use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::mailer::MailError;
use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    DuplicateReference(String),

    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// True for collaborator failures, as opposed to caller mistakes.
    fn is_unexpected(&self) -> bool {
        matches!(
            self,
            AppError::Store(_)
                | AppError::Mail(_)
                | AppError::Token(_)
                | AppError::Hash(_)
                | AppError::Internal(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unexpected() {
            tracing::error!("{}", self);
            return internal().into_response();
        }

        let (status, message) = match &self {
            AppError::Validation(violations) => (StatusCode::BAD_REQUEST, violations.join("\n")),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) | AppError::DuplicateReference(msg) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::InvalidCredential => {
                (StatusCode::BAD_REQUEST, "password incorrect".to_string())
            }
            AppError::Unauthenticated(msg) | AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            _ => internal(),
        };

        (status, message).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(AppError::not_found("film")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::not_found("film").to_string(), "film not found");
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(AppError::invalid("title is required")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflicts_return_409() {
        assert_eq!(
            response_status(AppError::Conflict("user already registered".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            response_status(AppError::DuplicateReference("there is a duplicated actor".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn auth_failures_map_to_401_and_403() {
        assert_eq!(
            response_status(AppError::Unauthenticated("token is missing".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(AppError::Unauthorized("unauthorized action".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(AppError::Forbidden("not allowed".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn collaborator_failures_return_500() {
        let err = AppError::Mail(MailError::Delivery("smtp unreachable".into()));
        assert!(err.is_unexpected());
        assert!(!AppError::InvalidCredential.is_unexpected());
        assert_eq!(response_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_returns_500() {
        let err = AppError::Internal("boom".into());
        assert!(err.is_unexpected());
        assert_eq!(response_status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
