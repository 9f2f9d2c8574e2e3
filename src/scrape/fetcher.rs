//! Page fetching for the source site.

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use super::retry::RetryPolicy;
use crate::config::FetchConfig;
use crate::error::{RankingsError, Result};

/// Anything that can hand back the markup for a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// reqwest-backed page source with browser-like headers and retries
pub struct HttpFetcher {
    http: reqwest::Client,
    retry: RetryPolicy,
    login_markers: Vec<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(browser_headers())
            .redirect(Policy::limited(10))
            .build()?;

        Ok(Self {
            http,
            retry: RetryPolicy::from_config(config),
            login_markers: config.login_markers.clone(),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await?;

        if is_login_url(resp.url(), &self.login_markers) {
            return Err(RankingsError::LoginRedirect {
                url: resp.url().to_string(),
            });
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(RankingsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let what = format!("GET {url}");
        self.retry.run(&what, |_| self.fetch_once(url)).await
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// True when the URL we ended up at looks like a sign-in page
pub fn is_login_url(url: &Url, markers: &[String]) -> bool {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let location = format!("{}{}", host, url.path().to_ascii_lowercase());
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|m| location.contains(&m.to_ascii_lowercase()))
}
