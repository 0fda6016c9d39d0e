//! HTTP error mapping
//!
//! Handlers return [`ApiError`]; the billing error taxonomy maps onto HTTP
//! status codes here so route code never builds responses by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use medialog_billing::BillingError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Billing(e) => match e {
                BillingError::Validation(_) => StatusCode::BAD_REQUEST,
                BillingError::NotFound(_) => StatusCode::NOT_FOUND,
                BillingError::Conflict(_) => StatusCode::CONFLICT,
                BillingError::InvalidPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BillingError::Store(_) | BillingError::Transient(_) => StatusCode::BAD_GATEWAY,
                BillingError::Serialization(_) | BillingError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Billing(e) => match e {
                BillingError::Validation(_) => "validation_error",
                BillingError::NotFound(_) => "not_found",
                BillingError::Conflict(_) => "conflict",
                BillingError::InvalidPlan(_) => "invalid_plan",
                BillingError::Store(_) => "store_error",
                BillingError::Transient(_) => "upstream_unavailable",
                BillingError::Serialization(_) | BillingError::Internal(_) => "internal_error",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
