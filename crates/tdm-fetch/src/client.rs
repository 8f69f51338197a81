use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use tdm_engine::{ParseDiagnostic, RuleSet};

use crate::meta::MetaExtractor;

/// Well-known location of a host's TDMRep rules document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/tdmrep.json";

/// Transport settings for a [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("tdm-check/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches the three TDMRep signal channels for a URL.
///
/// Every fetch method returns `Option`: any transport or decode failure is
/// logged and collapses to `None`, i.e. "this source is absent". The engine
/// treats an absent source exactly like an inconclusive one, so fetch
/// problems can never turn into a restriction (or a permission) by accident.
pub struct Fetcher {
    client: reqwest::Client,
    meta: MetaExtractor,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        let meta = MetaExtractor::new().context("failed to build meta extractor")?;
        Ok(Self { client, meta })
    }

    /// Fetch and parse the well-known rules document for `url`'s origin.
    pub async fn fetch_rules(&self, url: &Url) -> Option<(RuleSet, Vec<ParseDiagnostic>)> {
        let well_known = match well_known_url(url) {
            Ok(u) => u,
            Err(err) => {
                warn!(url = %url, error = %err, "cannot derive well-known URL");
                return None;
            }
        };

        let document = match self.get_json(&well_known).await {
            Ok(value) => value,
            Err(err) => {
                debug!(url = %well_known, error = %err, "no usable rules document");
                return None;
            }
        };

        match RuleSet::from_json(&document) {
            Ok((rules, diagnostics)) => {
                debug!(url = %well_known, rules = rules.len(), "rules document loaded");
                Some((rules, diagnostics))
            }
            Err(err) => {
                warn!(url = %well_known, error = %err, "malformed rules document");
                None
            }
        }
    }

    /// Fetch the response headers for `url` as a string map.
    ///
    /// Tries `HEAD` first and falls back to `GET` when the server rejects
    /// the method.
    pub async fn fetch_headers(&self, url: &Url) -> Option<HashMap<String, String>> {
        let response = match self.client.head(url.clone()).send().await {
            Ok(resp) if resp.status() != StatusCode::METHOD_NOT_ALLOWED => resp,
            _ => match self.client.get(url.clone()).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    debug!(url = %url, error = %err, "header fetch failed");
                    return None;
                }
            },
        };

        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "header fetch unsuccessful");
            return None;
        }

        Some(header_pairs(response.headers()))
    }

    /// Fetch `url` and extract the `<meta>` pairs from its head.
    pub async fn fetch_meta(&self, url: &Url) -> Option<HashMap<String, String>> {
        let html = match self.get_text(url).await {
            Ok(body) => body,
            Err(err) => {
                debug!(url = %url, error = %err, "page fetch failed");
                return None;
            }
        };
        Some(self.meta.extract(&html))
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            bail!("GET {url} returned {}", response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("response from {url} is not valid JSON"))
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if !response.status().is_success() {
            bail!("GET {url} returned {}", response.status());
        }
        response
            .text()
            .await
            .with_context(|| format!("failed to read body from {url}"))
    }
}

/// Derive the well-known rules-document URL from any URL on the same origin.
pub fn well_known_url(url: &Url) -> Result<Url> {
    if !url.has_host() {
        bail!("URL {url} has no host to derive an origin from");
    }
    url.join(WELL_KNOWN_PATH)
        .with_context(|| format!("failed to join {WELL_KNOWN_PATH} onto {url}"))
}

/// Lower a [`HeaderMap`] into a plain string map; values that are not valid
/// UTF-8 are dropped.
fn header_pairs(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn well_known_url_replaces_the_path() {
        let url = Url::parse("https://example.com/articles/42?page=2").unwrap();
        assert_eq!(
            well_known_url(&url).unwrap().as_str(),
            "https://example.com/.well-known/tdmrep.json"
        );
    }

    #[test]
    fn well_known_url_keeps_port_and_scheme() {
        let url = Url::parse("http://example.com:8080/x").unwrap();
        assert_eq!(
            well_known_url(&url).unwrap().as_str(),
            "http://example.com:8080/.well-known/tdmrep.json"
        );
    }

    #[test]
    fn well_known_url_requires_a_host() {
        let url = Url::parse("mailto:someone@example.com").unwrap();
        assert!(well_known_url(&url).is_err());
    }

    #[test]
    fn header_pairs_keeps_names_and_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("tdm-reservation"),
            HeaderValue::from_static("1"),
        );
        headers.insert(
            HeaderName::from_static("tdm-policy"),
            HeaderValue::from_static("https://host/policy"),
        );
        let pairs = header_pairs(&headers);
        assert_eq!(pairs.get("tdm-reservation").map(String::as_str), Some("1"));
        assert_eq!(
            pairs.get("tdm-policy").map(String::as_str),
            Some("https://host/policy")
        );
    }

    #[test]
    fn default_config_has_sane_values() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("tdm-check/"));
    }

    #[test]
    fn fetcher_builds_from_default_config() {
        assert!(Fetcher::new(&FetchConfig::default()).is_ok());
    }
}
