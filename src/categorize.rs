use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::host_of;
use crate::search::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Social,
    Forum,
    QAndA,
    Wiki,
    Directory,
    News,
    Blog,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Social => "social",
            Category::Forum => "forum",
            Category::QAndA => "q_and_a",
            Category::Wiki => "wiki",
            Category::Directory => "directory",
            Category::News => "news",
            Category::Blog => "blog",
            Category::Other => "other",
        };
        f.write_str(s)
    }
}

/// Host substrings per category, checked top to bottom.
const HOST_RULES: &[(Category, &[&str])] = &[
    (
        Category::Social,
        &[
            "facebook.com", "twitter.com", "x.com", "linkedin.com", "instagram.com",
            "pinterest.", "youtube.com", "tiktok.com",
        ],
    ),
    (Category::QAndA, &["quora.com", "stackoverflow.com", "stackexchange.com", "answers."]),
    (Category::Forum, &["reddit.com", "forum", "community.", "discourse.", "news.ycombinator.com"]),
    (Category::Wiki, &["wikipedia.org", "wiki"]),
    (
        Category::Directory,
        &[
            "directory",
            "yelp.com",
            "producthunt.com",
            "crunchbase.com",
            "g2.com",
            "capterra.com",
            "listing",
        ],
    ),
    (
        Category::News,
        &["news", "techcrunch.com", "forbes.com", "bbc.", "cnn.com", "reuters.com"],
    ),
    (
        Category::Blog,
        &["blog", "medium.com", "substack.com", "wordpress.com", "dev.to", "hashnode."],
    ),
];

/// Category of a URL by substring match on its host, then on its path for blogs.
pub fn categorize(url: &str) -> Category {
    let Ok(host) = host_of(url) else {
        return Category::Other;
    };
    let host = host.to_lowercase();
    let host = host.trim_start_matches("www.");

    for (category, needles) in HOST_RULES {
        if needles.iter().any(|n| matches_host(host, n)) {
            return *category;
        }
    }

    let lower = url.to_lowercase();
    if lower.contains("/blog/") || lower.contains("/blog?") || lower.ends_with("/blog") {
        return Category::Blog;
    }
    Category::Other
}

// Full domains must match the host or a subdomain; fragments match anywhere.
fn matches_host(host: &str, needle: &str) -> bool {
    let is_full_domain = needle.contains('.') && !needle.ends_with('.') && !needle.starts_with('.');
    if is_full_domain {
        host == needle || host.ends_with(&format!(".{needle}"))
    } else {
        host.contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedResult {
    #[serde(flatten)]
    pub result: SearchResult,
    pub category: Category,
}

/// Tags each result with its category, keeping input order.
pub fn categorize_results(results: &[SearchResult]) -> Vec<CategorizedResult> {
    results
        .iter()
        .map(|r| CategorizedResult {
            result: r.clone(),
            category: categorize(&r.link),
        })
        .collect()
}

/// Counts per category in order of first appearance.
pub fn count_by_category(results: &[CategorizedResult]) -> Vec<(Category, usize)> {
    let mut counts: Vec<(Category, usize)> = Vec::new();
    for r in results {
        match counts.iter_mut().find(|(c, _)| *c == r.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.category, 1)),
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fake::result;

    #[test]
    fn hosts() {
        assert_eq!(categorize("https://www.reddit.com/r/seo/comments/1"), Category::Forum);
        assert_eq!(categorize("https://twitter.com/someone"), Category::Social);
        assert_eq!(categorize("https://www.quora.com/What-is-SEO"), Category::QAndA);
        assert_eq!(categorize("https://en.wikipedia.org/wiki/Backlink"), Category::Wiki);
        assert_eq!(categorize("https://www.producthunt.com/posts/x"), Category::Directory);
        assert_eq!(categorize("https://techcrunch.com/2024/01/01/x"), Category::News);
        assert_eq!(categorize("https://someone.medium.com/post"), Category::Blog);
        assert_eq!(categorize("https://forum.example.org/t/1"), Category::Forum);
    }

    #[test]
    fn full_domains_do_not_match_inside_other_hosts() {
        // "x.com" must not match "box.com".
        assert_eq!(categorize("https://box.com/pricing"), Category::Other);
        assert_eq!(categorize("https://mobile.x.com/status/1"), Category::Social);
    }

    #[test]
    fn blog_by_path_and_fallbacks() {
        assert_eq!(categorize("https://acme.example/blog/launch"), Category::Blog);
        assert_eq!(categorize("https://acme.example/pricing"), Category::Other);
        assert_eq!(categorize("not a url"), Category::Other);
    }

    #[test]
    fn categorized_results_serialize_flat() {
        let out = categorize_results(&[result("https://www.reddit.com/r/rust")]);
        let v = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(v["category"], "forum");
        assert_eq!(v["link"], "https://www.reddit.com/r/rust");
        assert_eq!(Category::QAndA.to_string(), "q_and_a");
    }

    #[test]
    fn counts_in_first_seen_order() {
        let out = categorize_results(&[
            result("https://blog.acme.example/a"),
            result("https://www.reddit.com/r/a"),
            result("https://blog.other.example/b"),
        ]);
        assert_eq!(
            count_by_category(&out),
            vec![(Category::Blog, 2), (Category::Forum, 1)]
        );
    }
}
