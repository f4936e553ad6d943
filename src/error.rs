use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value as JsonValue};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Authentication {
        message: String,
        requires_verification: bool,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Token(String),

    #[error("{0}")]
    AlreadyVerified(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            requires_verification: false,
        }
    }

    pub fn requires_verification(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            requires_verification: true,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            Error::Validation(errors) => {
                let details: Vec<JsonValue> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |err| {
                            json!({
                                "field": field,
                                "message": err.message.clone().unwrap_or_else(|| err.code.clone()),
                            })
                        })
                    })
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "success": false,
                        "message": "Validation failed",
                        "errors": details,
                    }),
                )
            }
            Error::Conflict(msg) | Error::Token(msg) | Error::AlreadyVerified(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            Error::Authentication {
                message,
                requires_verification,
            } => {
                let mut body = json!({ "success": false, "message": message });
                if requires_verification {
                    body["requiresVerification"] = json!(true);
                }
                (StatusCode::UNAUTHORIZED, body)
            }
            Error::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": msg }),
            ),
            Error::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "An unexpected error occurred" }),
                )
            }
            Error::Config(msg) | Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "An unexpected error occurred" }),
                )
            }
            Error::Anyhow(err) => {
                tracing::error!(error = %err, "unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "An unexpected error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
