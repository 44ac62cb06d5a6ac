use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backlinks::{unique_referring_domains, Backlink, BacklinkFinder};
use crate::error::FetchError;
use crate::search::SearchClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPage {
    pub position: usize,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBacklinks {
    pub position: usize,
    pub url: String,
    pub title: String,
    pub backlinks_count: usize,
    pub unique_domains_count: usize,
    pub backlinks: Vec<Backlink>,
    pub unique_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub keyword: String,
    pub top_pages: Vec<RankedPage>,
    pub backlinks_analysis: Vec<PageBacklinks>,
}

/// What to do when backlinks for one ranked page cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnPageFailure {
    /// Abandon the whole analysis.
    #[default]
    Abort,
    /// Log it and leave that rank out of `backlinks_analysis`.
    Skip,
}

/// Maps the top-ranking pages for a keyword to their backlinks.
pub struct CompetitorAnalyzer {
    search: SearchClient,
    finder: BacklinkFinder,
    on_failure: OnPageFailure,
}

impl CompetitorAnalyzer {
    pub fn new(search: SearchClient) -> Self {
        Self {
            finder: BacklinkFinder::new(search.clone()),
            search,
            on_failure: OnPageFailure::default(),
        }
    }

    pub fn on_page_failure(mut self, policy: OnPageFailure) -> Self {
        self.on_failure = policy;
        self
    }

    /// Ranked pages are analysed one at a time, in rank order.
    pub async fn analyze_top_ranking_backlinks(
        &self,
        keyword: &str,
        num_results: usize,
        max_backlinks_per_url: usize,
    ) -> Result<CompetitorAnalysis, FetchError> {
        let serp = self.search.search_serp(keyword, num_results).await;
        info!("SERP for {:?}: {} ranked pages", keyword, serp.len());

        let top_pages: Vec<RankedPage> = serp
            .into_iter()
            .map(|(position, r)| RankedPage {
                position,
                url: r.link,
                title: r.title,
            })
            .collect();

        let mut backlinks_analysis = Vec::with_capacity(top_pages.len());
        for page in &top_pages {
            info!("#{} {}", page.position, page.url);
            let backlinks = match self
                .finder
                .find_backlinks_for_url(&page.url, max_backlinks_per_url)
                .await
            {
                Ok(b) => b,
                Err(e) if self.on_failure == OnPageFailure::Skip => {
                    warn!("Skipping #{} {}: {}", page.position, page.url, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let unique_domains = unique_referring_domains(&backlinks);
            backlinks_analysis.push(PageBacklinks {
                position: page.position,
                url: page.url.clone(),
                title: page.title.clone(),
                backlinks_count: backlinks.len(),
                unique_domains_count: unique_domains.len(),
                backlinks,
                unique_domains,
            });
        }

        Ok(CompetitorAnalysis {
            keyword: keyword.to_string(),
            top_pages,
            backlinks_analysis,
        })
    }
}
