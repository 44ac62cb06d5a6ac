use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Max results the search API returns per call.
pub const PAGE_SIZE: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERP_DELAY_MS: u64 = 1000;
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const API_KEY_VAR: &str = "GOOGLE_API_KEY";
const CSE_ID_VAR: &str = "GOOGLE_CSE_ID";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub cse_id: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub output_dir: PathBuf,
    pub serp_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            cse_id: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            serp_delay: Duration::from_millis(DEFAULT_SERP_DELAY_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unparseable numbers fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let request_timeout = non_empty("SCOUT_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let serp_delay = non_empty("SCOUT_SERP_DELAY_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.serp_delay);

        Self {
            api_key: non_empty(API_KEY_VAR),
            cse_id: non_empty(CSE_ID_VAR),
            request_timeout,
            user_agent: non_empty("SCOUT_USER_AGENT").unwrap_or(defaults.user_agent),
            output_dir: non_empty("SCOUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            serp_delay,
        }
    }

    /// API key and engine id, or an error naming the missing variable.
    pub fn search_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ConfigError(format!("{API_KEY_VAR} environment variable must be set")))?;
        let cx = self
            .cse_id
            .as_deref()
            .ok_or_else(|| ConfigError(format!("{CSE_ID_VAR} environment variable must be set")))?;
        Ok((key, cx))
    }
}
