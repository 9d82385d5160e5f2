use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use payx_schemas::enums::ErrorCategory;
use payx_schemas::AdmissionError;

/// Response-side wrapper so handlers can use `?` on coordinator results.
pub struct ApiError(pub AdmissionError);

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        ApiError(err)
    }
}

fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::ValidationError | ErrorCategory::LimitExceeded => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCategory::IdempotencyConflict | ErrorCategory::ConcurrencyConflict => {
            StatusCode::CONFLICT
        }
        ErrorCategory::KycDenied => StatusCode::FORBIDDEN,
        ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let category = self.0.category();
        let status = status_for(category);

        // Internal errors get logged with detail and surfaced generically.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = ?self.0, "unhandled admission error");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let mut error_body = json!({
            "category": category.as_str(),
            "message": message,
        });
        if let Some(dimension) = self.0.rate_limit_dimension() {
            error_body["dimension"] = json!(dimension.as_str());
        }

        (status, Json(json!({ "error": error_body }))).into_response()
    }
}
