use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;

use payx_schemas::{ProviderRequest, ProviderResponse};

use crate::error::ProviderError;
use crate::strategy::ProviderStrategy;

/// The confirm capability the pipeline consumes. The HTTP adapter is the
/// production implementation; tests plug in mocks.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn confirm(
        &self,
        strategy: &ProviderStrategy,
        request: &ProviderRequest,
        traceparent: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// reqwest adapter for the downstream provider service. One client, one
/// configured timeout; exceeding it maps to [`ProviderError::Timeout`].
pub struct HttpProviderClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProviderClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build provider HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ProviderApi for HttpProviderClient {
    async fn confirm(
        &self,
        strategy: &ProviderStrategy,
        request: &ProviderRequest,
        traceparent: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}{}", self.base_url, strategy.path);
        let mut call = self.client.post(&url).json(request);
        if let Some(traceparent) = traceparent {
            call = call.header("traceparent", traceparent);
        }

        let response = call.send().await.map_err(|err| {
            if err.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Unexpected(anyhow!(err).context("provider call failed"))
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProviderError::Upstream5xx {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Unexpected(anyhow!(
                "provider returned terminal status {status}"
            )));
        }

        response
            .json::<ProviderResponse>()
            .await
            .map_err(|err| ProviderError::Unexpected(anyhow!(err).context("invalid provider response")))
    }
}
