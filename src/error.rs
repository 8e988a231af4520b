use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network failure")]
    NetworkFailure,

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Session storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Machine-readable tag carried in error response bodies. The client
    /// maps this back into the same taxonomy instead of matching on
    /// human-readable messages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthError(e) => e.code(),
            AppError::ValidationError(_) => "validation_failure",
            AppError::NetworkFailure => "network_failure",
            AppError::DatabaseError(_) => "database_failure",
            AppError::StorageError(_) => "storage_failure",
            AppError::ConfigError(_) => "config_failure",
            AppError::InternalError(_) => "internal_error",
        }
    }

    /// True for the failure kinds that mean the presented token or session
    /// is no longer usable. Callers holding a session react to these by
    /// discarding it.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::AuthError(
                AuthError::InvalidCredentials
                    | AuthError::MalformedToken
                    | AuthError::ExpiredToken
                    | AuthError::BadSignature
            )
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::DatabaseError(DatabaseError::NotFound),
            _ => AppError::DatabaseError(DatabaseError::QueryError(err.to_string())),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "code": self.code(),
                "message": self.to_string()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::DuplicateIdentifier => StatusCode::CONFLICT,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NetworkFailure => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateIdentifier,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Bad token signature")]
    BadSignature,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::DuplicateIdentifier => "duplicate_identifier",
            AuthError::MalformedToken => "malformed_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::BadSignature => "bad_signature",
        }
    }

    /// Inverse of [`AuthError::code`], used when decoding error bodies on
    /// the client side.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "invalid_credentials" => Some(AuthError::InvalidCredentials),
            "duplicate_identifier" => Some(AuthError::DuplicateIdentifier),
            "malformed_token" => Some(AuthError::MalformedToken),
            "expired_token" => Some(AuthError::ExpiredToken),
            "bad_signature" => Some(AuthError::BadSignature),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session data: {0}")]
    Corrupt(String),

    #[error("No usable storage location")]
    Unavailable,
}
