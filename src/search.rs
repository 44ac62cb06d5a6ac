use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, PAGE_SIZE};
use crate::error::{ConfigError, FetchError};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// One organic result, in API rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, alias = "displayLink")]
    pub display_link: String,
}

/// One page of a paged search API.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// `start` is the 1-based rank of the first result; `num` is at most [`PAGE_SIZE`].
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<SearchResult>, FetchError>;
}

/// Google Custom Search JSON API.
pub struct GoogleSearchApi {
    client: reqwest::Client,
    api_key: String,
    cse_id: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl GoogleSearchApi {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let (api_key, cse_id) = config.search_credentials()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError(format!("failed to build search client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
        })
    }
}

#[async_trait]
impl SearchApi for GoogleSearchApi {
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        num: usize,
    ) -> Result<Vec<SearchResult>, FetchError> {
        let num = num.to_string();
        let start = start.to_string();
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::new(ENDPOINT, e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::new(ENDPOINT, e.without_url().to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(FetchError::new(ENDPOINT, message).with_status(status.as_u16()));
        }

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::new(ENDPOINT, format!("bad search response: {e}")))?;
        Ok(parsed.items)
    }
}

/// Flattens paged API calls into one ordered result list.
#[derive(Clone)]
pub struct SearchClient {
    api: Arc<dyn SearchApi>,
    serp_delay: Duration,
}

impl SearchClient {
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        Self {
            api,
            serp_delay: Duration::ZERO,
        }
    }

    /// Fixed wait between pages in [`SearchClient::search_serp`].
    pub fn with_serp_delay(mut self, delay: Duration) -> Self {
        self.serp_delay = delay;
        self
    }

    /// Strict search: a failed page aborts the whole search.
    pub async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, FetchError> {
        let mut results = Vec::new();

        for page in 0..num_results.div_ceil(PAGE_SIZE) {
            let want = PAGE_SIZE.min(num_results - results.len());
            let items = self.api.fetch_page(query, page * PAGE_SIZE + 1, want).await?;
            let got = items.len();
            results.extend(items.into_iter().take(want));
            debug!("Search {:?} page {}: {} results", query, page + 1, got);
            if got < want {
                break;
            }
        }

        Ok(results)
    }

    /// Lenient search for SERP analysis, each result paired with its 1-based rank.
    ///
    /// Failed pages are logged and skipped; ranks after a skipped page keep
    /// their SERP position. Calls are spaced by the SERP delay, and the wait
    /// after a rate-limited page is doubled. Failed pages are not retried.
    pub async fn search_serp(
        &self,
        query: &str,
        num_results: usize,
    ) -> Vec<(usize, SearchResult)> {
        let mut results = Vec::new();
        let mut wait = self.serp_delay;

        for page in 0..num_results.div_ceil(PAGE_SIZE) {
            if page > 0 && !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            wait = self.serp_delay;

            let start = page * PAGE_SIZE + 1;
            let want = PAGE_SIZE.min(num_results - page * PAGE_SIZE);
            match self.api.fetch_page(query, start, want).await {
                Ok(items) => {
                    let got = items.len();
                    results.extend(
                        items
                            .into_iter()
                            .take(want)
                            .enumerate()
                            .map(|(i, r)| (start + i, r)),
                    );
                    if got == 0 {
                        break;
                    }
                }
                Err(e) => {
                    warn!("SERP page {} for {:?} failed: {}", page + 1, query, e);
                    if e.is_rate_limited() {
                        wait = self.serp_delay * 2;
                        info!("Rate limited, next wait {:.1}s", wait.as_secs_f64());
                    }
                }
            }
        }

        results
    }
}

#[cfg(test)]
pub mod fake {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted search API: hands out queued page responses, recording every call.
    #[derive(Default)]
    pub struct FakeSearchApi {
        pages: Mutex<VecDeque<Result<Vec<SearchResult>, FetchError>>>,
        /// Fallback when the queue is empty: synthesise `num` results for the query.
        pub synthesize: bool,
        pub calls: Mutex<Vec<(String, usize, usize)>>,
    }

    pub fn result(link: &str) -> SearchResult {
        SearchResult {
            title: format!("Title of {link}"),
            link: link.to_string(),
            snippet: format!("Snippet for {link}"),
            display_link: link
                .split("//")
                .nth(1)
                .and_then(|r| r.split('/').next())
                .unwrap_or("")
                .to_string(),
        }
    }

    impl FakeSearchApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn synthesizing() -> Self {
            Self {
                synthesize: true,
                ..Self::default()
            }
        }

        pub fn push_page(self, links: &[&str]) -> Self {
            self.pages
                .lock()
                .unwrap()
                .push_back(Ok(links.iter().map(|l| result(l)).collect()));
            self
        }

        pub fn push_error(self, err: FetchError) -> Self {
            self.pages.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn calls(&self) -> Vec<(String, usize, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchApi for FakeSearchApi {
        async fn fetch_page(
            &self,
            query: &str,
            start: usize,
            num: usize,
        ) -> Result<Vec<SearchResult>, FetchError> {
            self.calls.lock().unwrap().push((query.to_string(), start, num));
            if let Some(next) = self.pages.lock().unwrap().pop_front() {
                return next;
            }
            if self.synthesize {
                let slug: String = query
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                    .collect();
                return Ok((start..start + num)
                    .map(|i| result(&format!("https://site{i}.example/{slug}")))
                    .collect());
            }
            Ok(Vec::new())
        }
    }
}
