//! Erreurs HTTP
//!
//! Les violations de contraintes PostgreSQL sont traduites en 400 / 409, le
//! reste en 500. Le corps est toujours `{"error": "..."}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tracing::error;

use rgph_io::TabularError;

use crate::export::ExportError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i32) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }

    /// Classe une erreur SQL selon son SQLSTATE
    pub fn from_sql_state(code: Option<&SqlState>, message: String) -> Self {
        match code {
            Some(c) if *c == SqlState::UNIQUE_VIOLATION => ApiError::Conflict(message),
            Some(c)
                if *c == SqlState::FOREIGN_KEY_VIOLATION
                    || *c == SqlState::CHECK_VIOLATION
                    || *c == SqlState::NOT_NULL_VIOLATION
                    || *c == SqlState::INVALID_TEXT_REPRESENTATION
                    || *c == SqlState::NUMERIC_VALUE_OUT_OF_RANGE =>
            {
                ApiError::BadRequest(message)
            }
            _ => ApiError::Internal(message),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

impl From<tokio_postgres::Error> for ApiError {
    fn from(e: tokio_postgres::Error) -> Self {
        let message = e
            .as_db_error()
            .map(|db| match db.detail() {
                Some(detail) => format!("{}: {}", db.message(), detail),
                None => db.message().to_string(),
            })
            .unwrap_or_else(|| e.to_string());
        let api_error = ApiError::from_sql_state(e.code(), message);
        if let ApiError::Internal(_) = api_error {
            error!(error = %e, "Database error");
        }
        api_error
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        error!(error = %e, "Failed to get connection from pool");
        ApiError::Internal("Database unavailable".into())
    }
}

impl From<TabularError> for ApiError {
    fn from(e: TabularError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::InvalidZoneType => ApiError::BadRequest(e.to_string()),
            ExportError::NotFound(message) => ApiError::NotFound(message),
            ExportError::Database(e) => e.into(),
            ExportError::Tabular(e) => {
                error!(error = %e, "Failed to write workbook");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        error!(error = %e, "Blocking task failed");
        ApiError::Internal(e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %format!("{:#}", e), "Request failed");
        ApiError::Internal(format!("{:#}", e))
    }
}
