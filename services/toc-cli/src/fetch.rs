//! HTTP fetcher for capability documents and REST listings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use toc_common::{TocError, TocResult};
use toc_engine::CapabilityFetcher;

/// Fetches documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CapabilityFetcher for ReqwestFetcher {
    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> TocResult<String> {
        let fetch_error = |e: reqwest::Error| TocError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_error)?;
        let text = response.text().await.map_err(fetch_error)?;

        debug!(bytes = text.len(), "Fetched source document");
        Ok(text)
    }
}
