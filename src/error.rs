use thiserror::Error;

/// Network or API failure fetching search results or a page.
#[derive(Debug, Clone, Error)]
#[error("fetch failed for {url}: {message}")]
pub struct FetchError {
    pub url: String,
    /// HTTP status when the server answered, `None` for transport failures.
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// 429s and quota/rate messages from the search API.
    pub fn is_rate_limited(&self) -> bool {
        if self.status == Some(429) {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("rate limit") || msg.contains("ratelimit") || msg.contains("quota")
    }
}

#[derive(Debug, Clone, Error)]
#[error("malformed url {input:?}: {reason}")]
pub struct ParseError {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export for {0}")]
    Empty(String),
    #[error("record {index} is not a flat object")]
    NotARecord { index: usize },
    #[error("record {index} has keys {found:?}, expected {expected:?}")]
    MismatchedKeys {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Missing or unusable configuration.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);
