use crate::config::HttpConfig;
use crate::models::Source;
use crate::providers::error::ProviderError;
use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Desktop browser agents, rotated per request for feeds that throttle
/// obvious scripts.
const BROWSER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
];

/// One GET per call, no retries here; the collector owns retry policy.
pub struct HttpClient {
    inner: reqwest::Client,
    provider: Source,
    rotate_agent: bool,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, provider: Source) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            provider,
            rotate_agent: false,
        })
    }

    pub fn with_browser_agents(mut self) -> Self {
        self.rotate_agent = true;
        self
    }

    /// Fetch a URL as text. Query strings are kept out of logs since they
    /// carry API keys.
    pub async fn get_text(&self, url: Url) -> Result<String, ProviderError> {
        debug!("GET {}{}", url.host_str().unwrap_or_default(), url.path());

        let mut req = self.inner.get(url);
        if self.rotate_agent {
            if let Some(agent) = BROWSER_AGENTS.choose(&mut rand::rng()) {
                req = req.header(USER_AGENT, *agent);
            }
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                provider: self.provider,
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: self.provider,
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                provider: self.provider,
            }
        } else {
            ProviderError::Network {
                provider: self.provider,
                message: e.without_url().to_string(),
            }
        }
    }
}
