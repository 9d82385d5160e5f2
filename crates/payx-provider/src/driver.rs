use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use payx_resilience::{Bulkhead, CircuitBreaker, CircuitBreakerConfig, RetryPolicy};
use payx_schemas::rails::supported_provider_names;
use payx_schemas::{Payment, ProviderRequest, ProviderResponse};

use crate::client::ProviderApi;
use crate::error::ProviderError;
use crate::strategy::strategy_for;

/// Drives one provider confirm call per payment: breaker gate first, then a
/// bulkhead slot, then the retry harness around the HTTP round-trip.
/// Breaker bookkeeping happens on the final outcome, not per attempt.
pub struct ProviderDriver<P> {
    client: P,
    bulkhead: Bulkhead,
    breakers: HashMap<&'static str, CircuitBreaker>,
    retry_policy: RetryPolicy,
}

impl<P: ProviderApi> ProviderDriver<P> {
    pub fn new(
        client: P,
        bulkhead_limit_per_provider: usize,
        breaker_config: CircuitBreakerConfig,
        retry_policy: RetryPolicy,
    ) -> Self {
        let breakers = supported_provider_names()
            .into_iter()
            .map(|name| (name, CircuitBreaker::new(breaker_config)))
            .collect();
        Self {
            client,
            bulkhead: Bulkhead::new(bulkhead_limit_per_provider),
            breakers,
            retry_policy,
        }
    }

    pub async fn execute(
        &self,
        payment: &Payment,
        traceparent: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let strategy = strategy_for(payment.method);
        let breaker = self
            .breakers
            .get(strategy.provider_name)
            .expect("every rail has a breaker by construction");

        breaker.allow_call().map_err(|_| ProviderError::CircuitOpen)?;

        let _slot = self.bulkhead.acquire(strategy.provider_name).await;
        let started = Instant::now();

        let request = ProviderRequest {
            payment_id: payment.payment_id,
            merchant_id: payment.merchant_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            method: payment.method,
        };

        let result = payx_resilience::retry(self.retry_policy, ProviderError::is_transient, || {
            self.client.confirm(&strategy, &request, traceparent)
        })
        .await;

        match result {
            Ok(response) => {
                breaker.on_success();
                debug!(
                    provider = strategy.provider_name,
                    payment_id = %payment.payment_id,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "provider_confirm"
                );
                Ok(response)
            }
            Err(err) => {
                breaker.on_failure();
                warn!(
                    provider = strategy.provider_name,
                    payment_id = %payment.payment_id,
                    error = %err,
                    "provider_call_failed"
                );
                Err(err)
            }
        }
    }

    /// Breaker state probe for tests and health reporting.
    pub fn breaker_state(&self, provider_name: &str) -> Option<payx_resilience::CircuitState> {
        self.breakers.get(provider_name).map(|b| b.state())
    }
}
