//! HTTP client for a CloudFront-style invalidation API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::backend::InvalidationBackend;
use super::error::InvalidationError;
use super::path::CachePath;
use crate::metrics;

/// Request body for `POST /distributions/{id}/invalidations`.
#[derive(Debug, Serialize)]
struct CreateInvalidationRequest<'a> {
    invalidation_batch: InvalidationBatch<'a>,
}

#[derive(Debug, Serialize)]
struct InvalidationBatch<'a> {
    paths: InvalidationPaths<'a>,
    caller_reference: String,
}

#[derive(Debug, Serialize)]
struct InvalidationPaths<'a> {
    quantity: usize,
    items: Vec<&'a str>,
}

impl<'a> CreateInvalidationRequest<'a> {
    fn new(paths: &'a [CachePath]) -> Self {
        Self {
            invalidation_batch: InvalidationBatch {
                paths: InvalidationPaths {
                    quantity: paths.len(),
                    items: paths.iter().map(CachePath::as_str).collect(),
                },
                caller_reference: uuid::Uuid::new_v4().to_string(),
            },
        }
    }
}

/// Acknowledgement returned by the CDN for an accepted invalidation.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidationReceipt {
    pub id: String,
    pub status: String,
}

/// HTTP invalidation backend for a single distribution.
pub struct HttpInvalidationBackend {
    client: reqwest::Client,
    base_url: String,
    distribution_id: String,
}

impl HttpInvalidationBackend {
    /// Create a new backend.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the invalidation API (e.g., "https://cdn.example.com/2020-05-31")
    /// * `distribution_id` - Distribution whose cache gets invalidated
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, distribution_id: String, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            distribution_id,
        })
    }

    pub fn distribution_id(&self) -> &str {
        &self.distribution_id
    }

    fn invalidations_url(&self) -> String {
        format!(
            "{}/distributions/{}/invalidations",
            self.base_url, self.distribution_id
        )
    }
}

#[async_trait]
impl InvalidationBackend for HttpInvalidationBackend {
    async fn send(&self, paths: &[CachePath]) -> Result<(), InvalidationError> {
        let url = self.invalidations_url();
        let body = CreateInvalidationRequest::new(paths);
        debug!(
            "POST {} ({} paths, caller_reference {})",
            url,
            paths.len(),
            body.invalidation_batch.caller_reference
        );

        let started = Instant::now();
        let result = self.client.post(&url).json(&body).send().await;
        metrics::record_backend_request(started.elapsed());

        let response =
            result.map_err(|e| InvalidationError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InvalidationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        match response.json::<InvalidationReceipt>().await {
            Ok(receipt) => info!(
                "Invalidation {} accepted for distribution {} ({})",
                receipt.id, self.distribution_id, receipt.status
            ),
            Err(e) => debug!("Invalidation accepted without a readable receipt: {}", e),
        }

        Ok(())
    }
}
