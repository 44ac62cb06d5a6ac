use std::sync::{Arc, OnceLock};

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Backlink, LinkMatch, VerifiedBacklink};
use crate::batch::{progress_bar, run_windowed};
use crate::config::DEFAULT_CONCURRENCY;
use crate::domain::bare_host;
use crate::fetch::PageFetcher;

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").unwrap())
}

/// Confirms candidate backlinks by looking for real anchors on the source page.
pub struct BacklinkVerifier {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
}

impl BacklinkVerifier {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// One output record per input backlink, in input order.
    ///
    /// Source pages are fetched `concurrency` at a time; each window is awaited
    /// in full before the next one starts.
    pub async fn verify_backlinks(
        &self,
        backlinks: &[Backlink],
        target: &str,
    ) -> Vec<VerifiedBacklink> {
        if backlinks.is_empty() {
            return Vec::new();
        }

        let host = bare_host(target);
        info!(
            "Verifying {} backlinks to {} ({} at a time)",
            backlinks.len(),
            host,
            self.concurrency
        );

        let pb = progress_bar(backlinks.len());
        let verified = run_windowed(backlinks, self.concurrency, &pb, |b| {
            self.verify_one(b, &host)
        })
        .await;
        pb.finish_and_clear();

        let summary = VerificationSummary::from_results(&verified);
        info!(
            "Verified {}/{} ({} failed, {} nofollow links)",
            summary.verified, summary.total, summary.failed, summary.nofollow_links
        );
        verified
    }

    async fn verify_one(&self, backlink: &Backlink, host: &str) -> VerifiedBacklink {
        match self.fetcher.fetch(&backlink.source_url).await {
            Ok(page) => {
                let links = find_links_to(&page.body, host);
                debug!(
                    "{}: {} links to {} ({}ms)",
                    backlink.source_url,
                    links.len(),
                    host,
                    page.latency_ms
                );
                VerifiedBacklink {
                    backlink: backlink.clone(),
                    verified: !links.is_empty(),
                    links,
                    status_code: page.status,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Could not verify {}: {}", backlink.source_url, e.message);
                VerifiedBacklink {
                    backlink: backlink.clone(),
                    verified: false,
                    links: Vec::new(),
                    status_code: e.status.unwrap_or(0),
                    error: Some(e.message),
                }
            }
        }
    }
}

/// Anchors whose href contains `host` (case-insensitive), in document order.
pub fn find_links_to(html: &str, host: &str) -> Vec<LinkMatch> {
    if host.is_empty() {
        return Vec::new();
    }
    let host = host.to_lowercase();
    let document = Html::parse_document(html);

    document
        .select(anchor_selector())
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if !href.to_lowercase().contains(&host) {
                return None;
            }
            let is_nofollow = a
                .value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("nofollow")))
                .unwrap_or(false);
            Some(LinkMatch {
                href: href.to_string(),
                anchor_text: collapse_whitespace(&a.text().collect::<String>()),
                is_nofollow,
            })
        })
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Totals over a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
    pub failed: usize,
    pub nofollow_links: usize,
    pub dofollow_links: usize,
}

impl VerificationSummary {
    /// `failed` counts records with a fetch error; they are also counted as unverified.
    pub fn from_results(results: &[VerifiedBacklink]) -> Self {
        let mut s = Self {
            total: results.len(),
            ..Self::default()
        };
        for r in results {
            if r.verified {
                s.verified += 1;
            } else {
                s.unverified += 1;
            }
            if r.error.is_some() {
                s.failed += 1;
            }
            for link in &r.links {
                if link.is_nofollow {
                    s.nofollow_links += 1;
                } else {
                    s.dofollow_links += 1;
                }
            }
        }
        s
    }
}
