use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("user not found")]
    UserNotFound,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("message quota exceeded")]
    QuotaExceeded,
    #[error("payment processing failed")]
    PaymentFailed,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0}")]
    Message(String),
}

impl AppError {
    /// Stable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            AppError::QuotaExceeded => "QUOTA_EXCEEDED",
            AppError::PaymentFailed => "PAYMENT_FAILED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Db(_) | AppError::Message(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UserNotFound | AppError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::PaymentFailed => StatusCode::PAYMENT_REQUIRED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Db(_) | AppError::Message(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(?self);
        }
        // Storage-layer failures are reported generically, domain errors verbatim.
        let message = if status.is_server_error() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };
        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            },
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
