use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

const INTERNAL_DETAILS: &str = "Something went wrong, contact the system admin";

/// Errors surfaced at the handler boundary.
///
/// Every variant renders as `{"error": <kind>, "details": <message>}`.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Message safe to show a client; server-side failures are logged instead.
    pub fn public_details(&self) -> String {
        match self {
            ApiError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                INTERNAL_DETAILS.to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                INTERNAL_DETAILS.to_string()
            }
            other => other.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Bad Request",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Database(_) | ApiError::Internal(_) => "Internal Server Error",
        }
    }
}

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            return ApiError::Conflict("Record already exists".into());
        }
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Record not found".into()),
            other => ApiError::Database(other),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "details": self.public_details(),
        }))
    }
}
