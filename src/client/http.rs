use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tracing::debug;
use crate::config::{ApiConfig, ApiPaths};
use crate::errors::HarvesterError;
use crate::models::ProvidersMetadata;
use super::api::{decode_identified, BatchLookupRequest, BatchLookupResponse, HarvesterApi, IdentifiedIndicator};
use super::transport::{SessionExpiredHandler, Transport};

/// `HarvesterApi` over HTTP.
pub struct ApiClient {
    transport: Transport,
    paths: ApiPaths,
    request_timeout: Duration,
    batch_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, on_expired: Arc<dyn SessionExpiredHandler>) -> Result<Self, HarvesterError> {
        Ok(Self {
            transport: Transport::new(config, on_expired)?,
            paths: config.paths.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            batch_timeout: Duration::from_secs(config.batch_timeout_secs),
        })
    }
}

#[async_trait]
impl HarvesterApi for ApiClient {
    async fn identify(&self, indicators: &[String]) -> Result<Vec<IdentifiedIndicator>, HarvesterError> {
        let body = serde_json::json!({ "indicators": indicators });
        let resp = self.transport
            .post_json(&self.paths.identify, body, self.request_timeout)
            .await?;
        let identified = decode_identified(resp);
        debug!(requested = indicators.len(), resolved = identified.len(), "Identified indicators");
        Ok(identified)
    }

    async fn batch_lookup(&self, request: &BatchLookupRequest) -> Result<BatchLookupResponse, HarvesterError> {
        let body = serde_json::to_value(request)?;
        let resp = self.transport
            .post_json(&self.paths.batch_lookup, body, self.batch_timeout)
            .await?;
        serde_json::from_value(resp)
            .map_err(|e| HarvesterError::InvalidResponse(format!("Malformed batch lookup response: {}", e)))
    }

    async fn providers(&self) -> Result<ProvidersMetadata, HarvesterError> {
        let resp = self.transport
            .get_json(&self.paths.providers, self.request_timeout)
            .await?;
        serde_json::from_value(resp)
            .map_err(|e| HarvesterError::InvalidResponse(format!("Malformed providers response: {}", e)))
    }

    fn backend_name(&self) -> &str {
        self.transport.base_url()
    }
}
