use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CollectError, Result};

/// Upper bound on workers per collection run.
pub const MAX_THREADS: usize = 500;

// ─── Collection / cache settings ─────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Number of concurrent workers per collection run
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Whether fresh results are memoized between scrapes
    #[serde(default)]
    pub cache_enabled: bool,

    /// How long a cached result stays eligible for replay (seconds, 0 disables)
    #[serde(default = "default_cache_duration_secs")]
    pub cache_duration_secs: u64,
}

fn default_threads() -> usize {
    6
}
fn default_cache_duration_secs() -> u64 {
    20
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            cache_enabled: false,
            cache_duration_secs: default_cache_duration_secs(),
        }
    }
}

impl CollectConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    /// True when the cache is switched on and has a non-zero TTL.
    pub fn caching(&self) -> bool {
        self.cache_enabled && self.cache_duration_secs > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(CollectError::Config(format!(
                "threads must be between 1 and {MAX_THREADS}, got {}",
                self.threads
            )));
        }
        Ok(())
    }
}

// ─── Upstream settings ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarborConfig {
    /// Base URL of the Harbor instance, e.g. `https://harbor.example.com`
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Optional subsystem inserted into every metric name
    #[serde(default)]
    pub instance: String,

    /// Harbor REST API generation; selects the API prefix and the
    /// repository endpoints
    #[serde(default)]
    pub api_version: ApiVersion,

    /// API prefix appended to `url`; empty means the version's default
    #[serde(default)]
    pub api_prefix: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,

    /// Page size requested from paginated endpoints
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard stop for one paginated listing; exceeding it fails the call
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_timeout_secs() -> u64 {
    5
}
fn default_page_size() -> usize {
    100
}
fn default_max_pages() -> usize {
    1000
}

impl HarborConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            instance: String::new(),
            api_version: ApiVersion::default(),
            api_prefix: String::new(),
            timeout_secs: default_timeout_secs(),
            insecure: false,
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full API root with no trailing slash.
    pub fn api_base(&self) -> String {
        let prefix = if self.api_prefix.is_empty() {
            self.api_version.prefix()
        } else {
            self.api_prefix.as_str()
        };
        format!(
            "{}{}",
            self.url.trim_end_matches('/'),
            prefix.trim_end_matches('/')
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(CollectError::Config(format!(
                "harbor url must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        if self.page_size == 0 {
            return Err(CollectError::Config("page_size must be positive".into()));
        }
        if self.max_pages == 0 {
            return Err(CollectError::Config("max_pages must be positive".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CollectError::Config(
                "timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ─── API version ─────────────────────────────────────────────────

/// Harbor 1.x serves `/api` with repositories listed by project id;
/// 2.x serves `/api/v2.0` with repositories nested under the project name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    #[default]
    V2,
}

impl ApiVersion {
    pub fn prefix(self) -> &'static str {
        match self {
            ApiVersion::V1 => "/api",
            ApiVersion::V2 => "/api/v2.0",
        }
    }
}

impl FromStr for ApiVersion {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ApiVersion::V1),
            "v2" | "2" | "v2.0" | "2.0" => Ok(ApiVersion::V2),
            other => Err(CollectError::Config(format!(
                "unknown harbor api version '{other}', expected v1 or v2"
            ))),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => f.write_str("v1"),
            ApiVersion::V2 => f.write_str("v2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_defaults_apply_to_empty_json() {
        let config: CollectConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CollectConfig::default());
        assert_eq!(config.threads, 6);
        assert!(!config.caching());
    }

    #[test]
    fn zero_duration_disables_caching() {
        let config = CollectConfig {
            cache_enabled: true,
            cache_duration_secs: 0,
            ..CollectConfig::default()
        };
        assert!(!config.caching());
    }

    #[test]
    fn threads_out_of_range_is_rejected() {
        let zero = CollectConfig {
            threads: 0,
            ..CollectConfig::default()
        };
        assert!(matches!(zero.validate(), Err(CollectError::Config(_))));

        let huge = CollectConfig {
            threads: MAX_THREADS + 1,
            ..CollectConfig::default()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn api_base_joins_without_double_slash() {
        let config = HarborConfig::new("https://harbor.local/");
        assert_eq!(config.api_base(), "https://harbor.local/api/v2.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn v1_selects_legacy_prefix_unless_overridden() {
        let mut config = HarborConfig::new("https://harbor.local");
        config.api_version = ApiVersion::V1;
        assert_eq!(config.api_base(), "https://harbor.local/api");

        config.api_prefix = "/harbor/api/".into();
        assert_eq!(config.api_base(), "https://harbor.local/harbor/api");
    }

    #[test]
    fn api_version_parses_common_spellings() {
        assert_eq!("v1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("2.0".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert!(matches!("v3".parse::<ApiVersion>(), Err(CollectError::Config(_))));

        let config: HarborConfig =
            serde_json::from_str(r#"{"url": "http://h", "api_version": "v1"}"#).unwrap();
        assert_eq!(config.api_version, ApiVersion::V1);
        assert_eq!(config.max_pages, 1000);
    }

    #[test]
    fn zero_max_pages_is_rejected() {
        let mut config = HarborConfig::new("http://harbor.local");
        config.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn harbor_url_requires_scheme() {
        let config = HarborConfig::new("harbor.local");
        assert!(config.validate().is_err());
    }
}
