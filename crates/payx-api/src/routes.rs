//! Axum router and all HTTP handlers for payx-api.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. Handlers are `pub(crate)` so the tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use payx_admission::RequestHeaders;
use payx_schemas::CreatePaymentRequest;

use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/payments", post(create_payment))
        .route("/payments/:payment_id", get(get_payment))
        .route("/review/:payment_id/approve", post(approve_review))
        .route("/review/:payment_id/reject", post(reject_review))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ))
        .route("/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Static bearer-token gate, disabled by default. The health route sits
/// outside this layer so probes never need credentials.
pub(crate) async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth_enabled {
        return next.run(request).await;
    }
    let expected = match state.auth_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"category": "unexpected", "message": "Internal server error"}})),
            )
                .into_response();
        }
    };
    let presented = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(expected) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"category": "validation_error", "message": "Invalid or missing API token"}})),
        )
            .into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "service": state.build.service,
            "version": state.build.version,
        })),
    )
}

// ---------------------------------------------------------------------------
// POST /payments  (202 on admission, whatever the decision)
// ---------------------------------------------------------------------------

pub(crate) async fn create_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_headers = RequestHeaders {
        merchant_id: header_string(&headers, "X-Merchant-Id"),
        customer_id: header_string(&headers, "X-Customer-Id"),
        account_id: header_string(&headers, "X-Account-Id"),
        idempotency_key: header_string(&headers, "Idempotency-Key"),
        traceparent: header_string(&headers, "traceparent"),
    };
    let response = state.create.execute(request_headers, body).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// GET /payments/{payment_id}
// ---------------------------------------------------------------------------

pub(crate) async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = payx_admission::get_payment_status(&state.pool, payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}

// ---------------------------------------------------------------------------
// POST /review/{payment_id}/approve | /reject
// ---------------------------------------------------------------------------

pub(crate) async fn approve_review(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.review.approve(payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}

pub(crate) async fn reject_review(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.review.reject(payment_id).await?;
    Ok((StatusCode::OK, Json(response)))
}
