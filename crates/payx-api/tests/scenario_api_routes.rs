//! In-process router scenarios: health, the error envelope for edge
//! validation failures, and the bearer-token gate. No Postgres or Redis
//! needed; a lazy pool never connects because validation rejects these
//! requests before any query runs.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use payx_api::routes::build_router;
use payx_api::state::AppState;
use payx_cache::{Cache, MemoryCache};
use payx_config::ApiSettings;

fn app_state(auth_token: Option<&str>) -> Arc<AppState> {
    let mut settings = ApiSettings::from_env().expect("defaults parse");
    settings.api_auth_enabled = auth_token.is_some();
    settings.api_auth_token = auth_token.map(str::to_string);

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&settings.database_url)
        .expect("lazy pool");
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    Arc::new(AppState::from_settings(&settings, pool, cache))
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_service_and_version() {
    let app = build_router(app_state(None));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "payx-api");
}

#[tokio::test]
async fn missing_required_headers_is_a_422_with_envelope() {
    let app = build_router(app_state(None));
    let response = app
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"amount": 10.00, "currency": "BRL", "method": "PIX"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["category"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap_or("")
        .contains("X-Merchant-Id"));
}

#[tokio::test]
async fn unsupported_currency_is_rejected_at_the_edge() {
    let app = build_router(app_state(None));
    let response = app
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .header("Idempotency-Key", "idem-1")
                .header("X-Merchant-Id", "merchant-1")
                .header("X-Customer-Id", "customer-1")
                .header("X-Account-Id", "acct-1")
                .body(Body::from(
                    r#"{"amount": 10.00, "currency": "EUR", "method": "PIX"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["category"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap_or("")
        .contains("EUR"));
}

#[tokio::test]
async fn nonpositive_amount_is_rejected() {
    let app = build_router(app_state(None));
    let response = app
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .header("Idempotency-Key", "idem-1")
                .header("X-Merchant-Id", "merchant-1")
                .header("X-Customer-Id", "customer-1")
                .header("X-Account-Id", "acct-1")
                .body(Body::from(
                    r#"{"amount": 0, "currency": "BRL", "method": "PIX"}"#,
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn auth_gate_rejects_missing_and_wrong_tokens() {
    let app = build_router(app_state(Some("secret-token")));

    let response = app
        .clone()
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"amount": 1, "currency": "BRL", "method": "PIX"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .header("Authorization", "Bearer wrong")
                .body(Body::from(r#"{"amount": 1, "currency": "BRL", "method": "PIX"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A valid token clears the gate; the request then fails edge
    // validation (missing headers), proving it went through.
    let response = app
        .oneshot(
            Request::post("/payments")
                .header("Content-Type", "application/json")
                .header("Authorization", "Bearer secret-token")
                .body(Body::from(r#"{"amount": 1, "currency": "BRL", "method": "PIX"}"#))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_does_not_require_auth() {
    let app = build_router(app_state(Some("secret-token")));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
