use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
    pub latency_ms: u64,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page. Non-2xx answers are errors carrying the status.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher with a browser-like user agent and a fixed timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::new("", format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(url, format!("HTTP {status}")).with_status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::new(url, e.to_string()).with_status(status.as_u16()))?;
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!("Fetched {} ({}, {} bytes, {}ms)", url, status, body.len(), latency_ms);

        Ok(FetchedPage {
            status: status.as_u16(),
            body,
            latency_ms,
        })
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves canned pages keyed by URL; unknown URLs fail like a dead host.
    #[derive(Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, Result<FetchedPage, FetchError>>,
        pub calls: AtomicUsize,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                Ok(FetchedPage {
                    status: 200,
                    body: html.to_string(),
                    latency_ms: 1,
                }),
            );
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(
                url.to_string(),
                Err(FetchError::new(url, format!("HTTP {status}")).with_status(status)),
            );
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(url) {
                Some(r) => r.clone(),
                None => Err(FetchError::new(url, "dns error: no such host")),
            }
        }
    }
}
