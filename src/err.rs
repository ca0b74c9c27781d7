use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::contract::ValidationError;
use crate::storage::StoreError;

pub async fn handler404(path: Uri) -> Error {
    Error::NotFound {
        message: format!("Invalid path: {}", path),
    }
}

#[derive(Debug, Clone)]
pub enum Error {
    Validation { message: String, field: String },
    Unauthorized { message: String },
    NotFound { message: String },
    Internal { kind: &'static str, message: String },
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    field: Option<&'a str>,
}

impl Error {
    pub fn unauthorized() -> Error {
        Error::Unauthorized {
            message: "Unauthorized".to_string(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn invalid<F: Into<String>, S: Into<String>>(field: F, msg: S) -> Error {
        Error::Validation {
            message: msg.into(),
            field: field.into(),
        }
    }

    pub fn internal<S: Into<String>>(kind: &'static str, msg: S) -> Error {
        Error::Internal {
            kind,
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Validation { message, .. }
            | Error::Unauthorized { message }
            | Error::NotFound { message }
            | Error::Internal { message, .. } => message,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Error::Internal { kind, message } = &self {
            log::error!("Internal Server Error ({}): {}", kind, message);
        }
        let field = match &self {
            Error::Validation { field, .. } => Some(field.as_str()),
            _ => None,
        };
        let body = ErrorBody {
            message: self.message(),
            field,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            message: err.message,
            field: err.field,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound {
                message: err.to_string(),
            },
            StoreError::MissingReference { field, .. } | StoreError::Duplicate { field, .. } => {
                Self::Validation {
                    message: err.to_string(),
                    field: field.to_string(),
                }
            }
            StoreError::Database(db) => Self::from(db),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal {
            kind: "DatabaseError",
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Internal {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            kind: "SerializationError",
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            kind: "Unknown",
            message: format!("{:#}", err),
        }
    }
}
