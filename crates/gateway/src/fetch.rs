use crate::config::GatewayConfig;
use anyhow::Context;
use common::retry_with_backoff_async;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

const RETRY_BASE_DELAY_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid image url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request for {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: Url, status: StatusCode },

    #[error("image at {url} is larger than {limit} bytes")]
    TooLarge { url: Url, limit: usize },
}

impl FetchError {
    /// Connect failures, timeouts and 5xx answers are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request { source, .. } => source.is_connect() || source.is_timeout(),
            FetchError::Status { status, .. } => status.is_server_error(),
            FetchError::InvalidUrl { .. } | FetchError::TooLarge { .. } => false,
        }
    }
}

/// Downloads images over HTTP(S) with a size cap and bounded retries.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_image_bytes: usize,
    max_attempts: u32,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_image_bytes: usize, max_attempts: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            max_image_bytes,
            max_attempts,
        })
    }

    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        Self::new(
            Duration::from_millis(config.fetch_timeout_ms),
            config.max_image_bytes,
            config.fetch_retries,
        )
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = parse_image_url(url)?;
        let image = retry_with_backoff_async(
            || self.fetch_once(url.clone()),
            self.max_attempts,
            RETRY_BASE_DELAY_MS,
            "Image download",
            FetchError::is_transient,
        )
        .await?;

        tracing::debug!(bytes = image.len(), "Image downloaded");
        Ok(image)
    }

    async fn fetch_once(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let mut response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Request { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let limit = self.max_image_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { url, limit });
        }

        // Content-Length may be absent or wrong, so the cap is enforced while reading.
        let mut image = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if image.len() + chunk.len() > limit {
                        return Err(FetchError::TooLarge { url, limit });
                    }
                    image.extend_from_slice(&chunk);
                }
                Ok(None) => return Ok(image),
                Err(source) => return Err(FetchError::Request { url, source }),
            }
        }
    }
}

fn parse_image_url(raw: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}
