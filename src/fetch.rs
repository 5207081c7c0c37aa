//! # Page Fetcher Module
//!
//! ## Purpose
//! Abstraction over raw page retrieval for the entry assembler, with a plain
//! HTTP implementation. Fetching is deliberately best-effort: no caching, no
//! auth, no retries. A failed or non-2xx fetch is indistinguishable from a
//! page with no content.
//!
//! ## Input/Output Specification
//! - **Input**: Absolute page URL
//! - **Output**: Raw markup text, or absence on any failure
//! - **Timeouts**: Fixed per-request timeout; a stuck fetch blocks the run
//!   until it fires

use crate::config::DictionaryConfig;
use crate::errors::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Best-effort page retrieval. Implementations must swallow their own
/// failures and answer `None` instead of erroring.
#[async_trait]
pub trait PageFetcher {
    /// Fetch one page. `None` means network failure, timeout, non-2xx
    /// status, or unreadable body - the caller treats them all as "no
    /// content here".
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// Plain GET fetcher backed by a shared [`reqwest::Client`].
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    /// Build a fetcher with the configured timeout and user agent.
    pub fn new(config: &DictionaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Fetch returned {} for {}", response.status(), url);
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!("Failed to read body from {}: {}", url, e);
                None
            }
        }
    }
}
