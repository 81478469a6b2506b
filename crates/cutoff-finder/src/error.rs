use crate::admissions::{LoadError, QueryError, StoreError};
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Data(LoadError),
    Query(QueryError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Query(QueryError::InvalidQuery(_)) => StatusCode::BAD_REQUEST,
            AppError::Query(QueryError::Store(StoreError::DataUnavailable { .. })) => {
                StatusCode::NOT_FOUND
            }
            AppError::Query(QueryError::Store(
                StoreError::SchemaMismatch { .. } | StoreError::Unreadable { .. },
            )) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Query(QueryError::InvalidQuery(_)) => "invalid_query",
            AppError::Query(QueryError::Store(StoreError::DataUnavailable { .. })) => {
                "data_unavailable"
            }
            AppError::Query(QueryError::Store(StoreError::SchemaMismatch { .. })) => {
                "schema_mismatch"
            }
            AppError::Query(QueryError::Store(StoreError::Unreadable { .. })) => {
                "table_unreadable"
            }
            AppError::Data(_) => "data_load_failed",
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::Server(_) => {
                "internal"
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Data(err) => write!(f, "data error: {}", err),
            AppError::Query(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Data(err) => Some(err),
            AppError::Query(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<LoadError> for AppError {
    fn from(value: LoadError) -> Self {
        Self::Data(value)
    }
}

impl From<QueryError> for AppError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}
