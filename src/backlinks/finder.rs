use std::collections::HashSet;

use tracing::{debug, info};

use super::{Backlink, Target};
use crate::domain::{host_of, normalize_domain};
use crate::error::FetchError;
use crate::search::{SearchClient, SearchResult};

/// Turns domain- or URL-targeted searches into candidate backlinks.
#[derive(Clone)]
pub struct BacklinkFinder {
    search: SearchClient,
}

impl BacklinkFinder {
    pub fn new(search: SearchClient) -> Self {
        Self { search }
    }

    /// Pages mentioning `domain`, excluding pages hosted on it.
    pub async fn find_backlinks_for_domain(
        &self,
        domain: &str,
        num_results: usize,
    ) -> Result<Vec<Backlink>, FetchError> {
        let domain = normalize_domain(domain);
        let query = domain_query(&domain);
        info!("Searching backlinks for domain {} ({:?})", domain, query);

        let results = self.search.search(&query, num_results).await?;
        Ok(to_backlinks(results, || Target::TargetDomain(domain.clone())))
    }

    /// Pages quoting `url` verbatim.
    pub async fn find_backlinks_for_url(
        &self,
        url: &str,
        num_results: usize,
    ) -> Result<Vec<Backlink>, FetchError> {
        let url = url.trim();
        let query = url_query(url);
        debug!("Searching backlinks for url {}", url);

        let results = self.search.search(&query, num_results).await?;
        Ok(to_backlinks(results, || Target::TargetUrl(url.to_string())))
    }
}

pub fn domain_query(domain: &str) -> String {
    format!("\"{domain}\" -site:{domain}")
}

pub fn url_query(url: &str) -> String {
    format!("\"{url}\"")
}

fn to_backlinks(results: Vec<SearchResult>, target: impl Fn() -> Target) -> Vec<Backlink> {
    results
        .into_iter()
        .map(|r| Backlink {
            source_url: r.link,
            source_title: r.title,
            snippet: r.snippet,
            target: target(),
        })
        .collect()
}

/// Distinct source hostnames in first-seen order. Unparseable URLs are skipped.
pub fn unique_referring_domains(backlinks: &[Backlink]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut domains = Vec::new();

    for b in backlinks {
        match host_of(&b.source_url) {
            Ok(host) => {
                if seen.insert(host.clone()) {
                    domains.push(host);
                }
            }
            Err(e) => debug!("Skipping referring domain: {}", e),
        }
    }

    domains
}
