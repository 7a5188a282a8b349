//! HTTP configuration for the two upstream sources.
//!
//! Headers, timeouts, and base URLs live in an explicit [`HttpConfig`] that is
//! handed to each client at construction. Defaults can be overridden by a YAML
//! file passed with `--config`:
//!
//! ```yaml
//! scac:
//!   user_agent: "MyResearchBot/1.0 (me@example.edu)"
//!   timeout_secs: 20
//! sec:
//!   user_agent: "Jane Doe jane@example.com"
//! ```
//!
//! Keys left out of the file keep their defaults.

use crate::error::{Result, ScrapeError};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const SCAC_BASE_URL: &str = "https://securities.stanford.edu/";
pub const SEC_BASE_URL: &str = "https://www.sec.gov/";
pub const SEC_DATA_BASE_URL: &str = "https://data.sec.gov/";

const DEFAULT_USER_AGENT: &str = concat!(
    "filings_harvest/",
    env!("CARGO_PKG_VERSION"),
    " (contact: admin@example.com)"
);

/// Per-source HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub base_url: String,
    /// Secondary API host (SEC serves submissions from `data.sec.gov`).
    pub api_base_url: Option<String>,
    /// SEC rejects requests without a contactable user agent.
    pub user_agent: String,
    pub accept: Option<String>,
    pub timeout_secs: u64,
    /// Extra default headers sent on every request.
    pub headers: BTreeMap<String, String>,
}

impl HttpConfig {
    pub fn scac() -> Self {
        Self {
            base_url: SCAC_BASE_URL.to_string(),
            api_base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: Some("application/json, text/javascript, */*; q=0.01".to_string()),
            timeout_secs: 15,
            headers: BTreeMap::new(),
        }
    }

    pub fn sec() -> Self {
        Self {
            base_url: SEC_BASE_URL.to_string(),
            api_base_url: Some(SEC_DATA_BASE_URL.to_string()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: None,
            timeout_secs: 60,
            headers: BTreeMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL with exactly one trailing slash, so relative joins append.
    pub fn normalized_base_url(&self) -> String {
        with_trailing_slash(&self.base_url)
    }

    /// Secondary API host, falling back to the base URL.
    pub fn normalized_api_base_url(&self) -> String {
        with_trailing_slash(self.api_base_url.as_deref().unwrap_or(&self.base_url))
    }

    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &self.user_agent)?);
        if let Some(accept) = &self.accept {
            headers.insert(ACCEPT, header_value("Accept", accept)?);
        }
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScrapeError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = header_value(name.as_str(), value)?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Build a cookie-keeping client with this config's headers and timeout.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .default_headers(self.default_headers()?)
            .cookie_store(true)
            .timeout(self.timeout())
            .build()
            .map_err(|e| ScrapeError::Config(format!("cannot build HTTP client: {e}")))
    }
}

fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ScrapeError::Config(format!("invalid value for header {name}: {e}")))
}

/// Keys a config file may set for one source; anything absent keeps the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HttpOverrides {
    base_url: Option<String>,
    api_base_url: Option<String>,
    user_agent: Option<String>,
    accept: Option<String>,
    timeout_secs: Option<u64>,
    headers: BTreeMap<String, String>,
}

impl HttpOverrides {
    fn apply(self, mut base: HttpConfig) -> HttpConfig {
        if let Some(v) = self.base_url {
            base.base_url = v;
        }
        if let Some(v) = self.api_base_url {
            base.api_base_url = Some(v);
        }
        if let Some(v) = self.user_agent {
            base.user_agent = v;
        }
        if let Some(v) = self.accept {
            base.accept = Some(v);
        }
        if let Some(v) = self.timeout_secs {
            base.timeout_secs = v;
        }
        base.headers.extend(self.headers);
        base
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    scac: HttpOverrides,
    sec: HttpOverrides,
}

/// Whole-application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub scac: HttpConfig,
    pub sec: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scac: HttpConfig::scac(),
            sec: HttpConfig::sec(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(text)
            .map_err(|e| ScrapeError::Config(format!("invalid config file: {e}")))?;
        Ok(Self {
            scac: file.scac.apply(HttpConfig::scac()),
            sec: file.sec.apply(HttpConfig::sec()),
        })
    }

    /// Load from `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ScrapeError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}
