pub mod finder;
pub mod verify;

use serde::{Deserialize, Serialize};

pub use finder::{unique_referring_domains, BacklinkFinder};
pub use verify::{BacklinkVerifier, VerificationSummary};

/// What a backlink points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    TargetDomain(String),
    TargetUrl(String),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::TargetDomain(s) | Target::TargetUrl(s) => s,
        }
    }
}

/// A page found referencing a target domain or URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    pub source_url: String,
    pub source_title: String,
    pub snippet: String,
    #[serde(flatten)]
    pub target: Target,
}

/// An anchor on a source page that links to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMatch {
    pub href: String,
    pub anchor_text: String,
    pub is_nofollow: bool,
}

/// Backlink after fetching its source page.
///
/// Failed fetches keep the full shape: `verified = false`, no links, `error` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedBacklink {
    #[serde(flatten)]
    pub backlink: Backlink,
    pub verified: bool,
    pub links: Vec<LinkMatch>,
    pub status_code: u16,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_flattens_into_record() {
        let b = Backlink {
            source_url: "https://blog.example/post".into(),
            source_title: "Post".into(),
            snippet: "mentions target.example".into(),
            target: Target::TargetDomain("target.example".into()),
        };
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["target_domain"], "target.example");
        assert!(v.get("target").is_none());

        let back: Backlink = serde_json::from_value(v).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn url_target_reads_from_export() {
        let json = r#"{"source_url":"https://a.example/","source_title":"A","snippet":"",
            "target_url":"https://t.example/page"}"#;
        let b: Backlink = serde_json::from_str(json).unwrap();
        assert_eq!(b.target, Target::TargetUrl("https://t.example/page".into()));
        assert_eq!(b.target.as_str(), "https://t.example/page");
    }
}
