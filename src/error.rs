// src/error.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::Display;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        map_db_error(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub const INTERNAL_MESSAGE: &str = "Erro interno do servidor";

pub fn internal_error<E: Display>(e: E) -> AppError {
    tracing::error!(error = %e, "internal error");
    AppError::internal(INTERNAL_MESSAGE)
}

pub fn map_db_error(err: sqlx::Error) -> AppError {
    let status = match &err {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => StatusCode::CONFLICT,    // unique_violation
            Some("23503") => StatusCode::BAD_REQUEST, // foreign_key_violation
            Some("23502") => StatusCode::BAD_REQUEST, // not_null_violation
            Some("22P02") => StatusCode::BAD_REQUEST, // invalid_text_representation
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::error!(error = %err, status = %status, "database error");

    let message = match status {
        StatusCode::NOT_FOUND => "Registro não encontrado".to_string(),
        StatusCode::CONFLICT => "Registro já existe".to_string(),
        StatusCode::BAD_REQUEST => "Requisição inválida".to_string(),
        _ => "Erro ao acessar o banco de dados".to_string(),
    };

    AppError::new(status, message)
}

/// Like [`map_db_error`], but with a caller-specific message for unique
/// violations.
pub fn map_db_conflict(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            tracing::warn!(error = %err, "database conflict");
            return AppError::new(StatusCode::CONFLICT, message);
        }
    }
    map_db_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_is_not_found() {
        let err = map_db_error(sqlx::Error::RowNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn pool_errors_are_internal() {
        let err = map_db_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let err = map_db_conflict(sqlx::Error::PoolTimedOut, "dup");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn driver_detail_stays_out_of_the_message() {
        let err = map_db_error(sqlx::Error::Protocol("password authentication failed for user crm".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Erro ao acessar o banco de dados");

        let err = internal_error("connection refused (os error 111) at 10.0.0.4:5432");
        assert_eq!(err.message, INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn renders_json_error_body() {
        let resp = AppError::forbidden("sem acesso").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "sem acesso");
    }
}
