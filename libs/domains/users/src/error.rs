use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    /// A required field is absent or empty
    #[error("All fields are required")]
    MissingFields,

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Login attempt for an email with no account
    #[error("No account exists for that email")]
    UnknownEmail,

    /// Login attempt with a wrong password
    #[error("Password is not correct")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("Email '{0}' already in use")]
    DuplicateEmail(String),

    /// A stored digest failed to parse - a data problem, not a mismatch
    #[error("Stored credential is corrupt")]
    CorruptCredential,

    #[error("Token issuance failed: {0}")]
    Token(String),

    /// The store cannot be reached at all
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::MissingFields => AppError::BadRequest("All fields are required.".to_string()),
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::UnknownEmail => AppError::Unauthorized("User not found.".to_string()),
            UserError::InvalidCredentials => {
                AppError::Unauthorized("Password is not correct.".to_string())
            }
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::DuplicateEmail(email) => {
                AppError::Conflict(format!("Email '{}' already in use", email))
            }
            UserError::CorruptCredential => {
                AppError::InternalServerError("stored credential failed to parse".to_string())
            }
            UserError::Token(msg) => AppError::InternalServerError(msg),
            UserError::StorageUnavailable(msg) => AppError::ServiceUnavailable(msg),
            UserError::Database(msg) => AppError::InternalServerError(msg),
            UserError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        // Convert to AppError for the standardized error response format
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match &*err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                UserError::StorageUnavailable(err.to_string())
            }
            _ => UserError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (UserError::MissingFields, StatusCode::BAD_REQUEST),
            (
                UserError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (UserError::UnknownEmail, StatusCode::UNAUTHORIZED),
            (UserError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (UserError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                UserError::DuplicateEmail("jane@x.com".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                UserError::CorruptCredential,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                UserError::Database("driver".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                UserError::StorageUnavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_unknown_email_and_bad_password_are_distinct() {
        let unknown: AppError = UserError::UnknownEmail.into();
        let bad_password: AppError = UserError::InvalidCredentials.into();
        assert_ne!(unknown.to_string(), bad_password.to_string());
    }
}
