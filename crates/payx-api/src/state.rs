//! Shared state for the admission API. Handlers receive
//! `State<Arc<AppState>>`; this module owns nothing async itself.

use std::sync::Arc;

use sqlx::PgPool;

use payx_admission::{CreatePayment, ReviewWorkflow};
use payx_aml::{AmlConfig, AmlEngine};
use payx_cache::Cache;
use payx_config::ApiSettings;
use payx_gates::{IdempotencyGate, LimitsService, RateLimiter};
use payx_risk::RiskEngine;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BuildInfo {
    pub service: String,
    pub version: &'static str,
}

pub struct AppState {
    pub pool: PgPool,
    pub create: CreatePayment,
    pub review: ReviewWorkflow,
    pub build: BuildInfo,
    pub auth_enabled: bool,
    pub auth_token: Option<String>,
}

impl AppState {
    pub fn from_settings(settings: &ApiSettings, pool: PgPool, cache: Arc<dyn Cache>) -> Self {
        let create = CreatePayment::new(
            pool.clone(),
            IdempotencyGate::new(
                cache.clone(),
                std::time::Duration::from_secs(settings.idempotency_ttl_seconds),
            ),
            RateLimiter::new(
                cache.clone(),
                settings.merchant_rate_limit,
                settings.customer_rate_limit,
                settings.account_rate_limit,
                settings.rate_limit_window_seconds,
            ),
            LimitsService::new(
                cache.clone(),
                std::time::Duration::from_secs(settings.limits_policy_cache_ttl_seconds),
            ),
            RiskEngine::new(settings.risk_review_threshold, settings.risk_block_threshold),
            AmlEngine::new(
                cache,
                AmlConfig {
                    blocklist_destinations: settings.aml_blocklist_destinations.clone(),
                    total_window_seconds: settings.aml_total_window_seconds,
                    total_threshold_amount: settings.aml_total_threshold_amount,
                    structuring_window_seconds: settings.aml_structuring_window_seconds,
                    structuring_count_threshold: settings.aml_structuring_count_threshold,
                },
            ),
            settings.supported_currencies.clone(),
        );

        Self {
            pool: pool.clone(),
            create,
            review: ReviewWorkflow::new(pool),
            build: BuildInfo {
                service: settings.service_name.clone(),
                version: env!("CARGO_PKG_VERSION"),
            },
            auth_enabled: settings.api_auth_enabled,
            auth_token: settings.api_auth_token.clone(),
        }
    }
}
