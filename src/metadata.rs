use std::sync::{Arc, OnceLock};

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{progress_bar, run_windowed};
use crate::fetch::PageFetcher;

/// Phrases that suggest a page accepts submissions, keyed by signal name.
const SUBMISSION_SIGNALS: &[(&str, &[&str])] = &[
    ("write_for_us", &["write for us", "write for me"]),
    ("guest_post", &["guest post", "guest author", "guest blogging"]),
    ("submit", &["submit your", "submit a ", "submission"]),
    ("contribute", &["contribute", "contributor"]),
    ("add_your_site", &["add your site", "add your link", "suggest a site", "add url"]),
];

struct Selectors {
    title: Selector,
    meta: Selector,
    h1: Selector,
    h2: Selector,
    h3: Selector,
    form: Selector,
}

fn selectors() -> &'static Selectors {
    static SEL: OnceLock<Selectors> = OnceLock::new();
    SEL.get_or_init(|| Selectors {
        title: Selector::parse("title").unwrap(),
        meta: Selector::parse("meta[name]").unwrap(),
        h1: Selector::parse("h1").unwrap(),
        h2: Selector::parse("h2").unwrap(),
        h3: Selector::parse("h3").unwrap(),
        form: Selector::parse("form").unwrap(),
    })
}

/// On-page SEO fields for one URL. Always returned, even when the fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
    pub submission_signals: Vec<String>,
    pub status_code: u16,
    pub error: Option<String>,
}

/// Parse metadata out of an HTML document.
pub fn parse_metadata(url: &str, html: &str) -> PageMetadata {
    let doc = Html::parse_document(html);
    let sel = selectors();

    let title = doc
        .select(&sel.title)
        .next()
        .map(|t| clean(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let meta = |name: &str| {
        doc.select(&sel.meta)
            .find(|m| {
                m.value()
                    .attr("name")
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
            })
            .and_then(|m| m.value().attr("content"))
            .map(clean)
            .filter(|c| !c.is_empty())
    };

    let headings = |s: &Selector| -> Vec<String> {
        doc.select(s)
            .map(|h| clean(&h.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect()
    };

    let text = doc.root_element().text().collect::<String>().to_lowercase();
    let has_form = doc.select(&sel.form).next().is_some();

    PageMetadata {
        url: url.to_string(),
        title,
        description: meta("description"),
        keywords: meta("keywords"),
        h1: headings(&sel.h1),
        h2: headings(&sel.h2),
        h3: headings(&sel.h3),
        submission_signals: submission_signals(&text, has_form),
        status_code: 0,
        error: None,
    }
}

/// Signal names found in lowercased page text, in a fixed order.
pub fn submission_signals(text: &str, has_form: bool) -> Vec<String> {
    let mut found: Vec<String> = SUBMISSION_SIGNALS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| text.contains(p)))
        .map(|(name, _)| name.to_string())
        .collect();
    if has_form {
        found.push("form".into());
    }
    found
}

fn clean(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetch and parse one page. Failures produce a record with `error` set.
pub async fn extract_metadata(fetcher: &dyn PageFetcher, url: &str) -> PageMetadata {
    match fetcher.fetch(url).await {
        Ok(page) => PageMetadata {
            status_code: page.status,
            ..parse_metadata(url, &page.body)
        },
        Err(e) => {
            warn!("Metadata fetch failed for {}: {}", url, e.message);
            PageMetadata {
                url: url.to_string(),
                status_code: e.status.unwrap_or(0),
                error: Some(e.message),
                ..PageMetadata::default()
            }
        }
    }
}

/// Extract metadata for many URLs, `concurrency` pages at a time, in input order.
pub async fn extract_metadata_batch(
    fetcher: Arc<dyn PageFetcher>,
    urls: &[String],
    concurrency: usize,
) -> Vec<PageMetadata> {
    if urls.is_empty() {
        return Vec::new();
    }
    info!("Extracting metadata from {} pages", urls.len());

    let pb = progress_bar(urls.len());
    let results = run_windowed(urls, concurrency, &pb, |url| {
        let fetcher = Arc::clone(&fetcher);
        async move { extract_metadata(fetcher.as_ref(), url).await }
    })
    .await;
    pb.finish_and_clear();

    let failed = results.iter().filter(|m| m.error.is_some()).count();
    info!("Metadata: {} ok, {} failed", results.len() - failed, failed);
    results
}
