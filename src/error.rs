use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid or expired OTP")]
    OtpInvalidOrExpired,

    #[error("a valid OTP already exists for this order")]
    OtpStillValid,

    #[error("minimum order amount is {min_order:.2}, subtotal is {subtotal:.2}")]
    MinOrderNotMet { min_order: f64, subtotal: f64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_)
            | AppError::InvalidTransition(_)
            | AppError::OtpInvalidOrExpired
            | AppError::OtpStillValid
            | AppError::MinOrderNotMet { .. } => StatusCode::BAD_REQUEST,
        };

        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });

        if let AppError::MinOrderNotMet { min_order, subtotal } = &self {
            body["errorType"] = json!("MIN_ORDER_NOT_MET");
            body["shortfall"] = json!(min_order - subtotal);
        }

        (status, Json(body)).into_response()
    }
}
