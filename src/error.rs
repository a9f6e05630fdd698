use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{ApiResponse, ResponseCode};

/// Failures surfaced by a [`crate::store::Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

impl StoreError {
    /// Classifies a sqlx error, turning unique violations into [`StoreError::Conflict`].
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.constraint().unwrap_or("unique").to_string())
            }
            _ => Self::Backend(err),
        }
    }
}

/// The single error type returned by services and handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Expired(String),
    #[error("{0}")]
    TooManyAttempts(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    InvalidCode(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Store(#[from] StoreError),
    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ResponseCode {
        match self {
            Self::Validation(_)
            | Self::InvalidOperation(_)
            | Self::AlreadyExists(_)
            | Self::Expired(_)
            | Self::TooManyAttempts(_)
            | Self::RateLimited(_)
            | Self::InvalidCode(_) => ResponseCode::BadRequest,
            Self::Unauthorized(_) => ResponseCode::Unauthorized,
            Self::Forbidden(_) => ResponseCode::Forbidden,
            Self::NotFound(_) => ResponseCode::NotFound,
            Self::Store(_) | Self::Internal(_) => ResponseCode::Unexpected,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(format!("Validation failed: {errors}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ResponseCode::Success => StatusCode::OK,
            ResponseCode::BadRequest => StatusCode::BAD_REQUEST,
            ResponseCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ResponseCode::Forbidden => StatusCode::FORBIDDEN,
            ResponseCode::NotFound => StatusCode::NOT_FOUND,
            ResponseCode::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.code() == ResponseCode::Unexpected {
            log::error!("Request failed: {self}");
        }
        HttpResponse::build(self.status_code())
            .json(ApiResponse::<()>::failure(self.code(), self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn every_variant_maps_to_one_code_and_status() {
        let cases = [
            (AppError::Validation("v".into()), "01", 400),
            (AppError::InvalidOperation("i".into()), "01", 400),
            (AppError::AlreadyExists("a".into()), "01", 400),
            (AppError::Expired("e".into()), "01", 400),
            (AppError::TooManyAttempts("t".into()), "01", 400),
            (AppError::RateLimited("r".into()), "01", 400),
            (AppError::InvalidCode("c".into()), "01", 400),
            (AppError::Unauthorized("u".into()), "02", 401),
            (AppError::Forbidden("f".into()), "03", 403),
            (AppError::NotFound("n".into()), "04", 404),
            (AppError::Internal("boom".into()), "99", 500),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code().as_str(), code, "{err:?}");
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
        }
    }

    #[actix_web::test]
    async fn error_body_uses_the_envelope() {
        let response = AppError::NotFound("Business not found".into()).error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["isSuccessful"], false);
        assert_eq!(body["response"]["code"], "04");
        assert_eq!(body["response"]["description"], "Business not found");
    }

    #[test]
    fn unexpected_errors_carry_their_message() {
        let err = AppError::Internal("pool closed".into());
        assert_eq!(err.to_string(), "An unexpected error occurred: pool closed");
    }
}
