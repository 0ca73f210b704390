use std::time::Duration;

use reqwest::{Client, ClientBuilder, header};
use url::Url;

use super::{BrowserConfig, CrawlError};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to fetch page: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Page returned HTTP {0}")]
    Status(u16),

    #[error("Page is not HTML (content-type: {0})")]
    NotHtml(String),
}

#[derive(Debug)]
pub struct FetchedPage {
    pub final_url: Url,
    pub status_code: u16,
    pub html: String,
}

/// One browsing session. Opened per crawl and dropped when the crawl
/// returns; nothing is shared between requests.
pub struct BrowserSession {
    client: Client,
}

impl BrowserSession {
    pub fn open(config: &BrowserConfig) -> Result<Self, CrawlError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert("viewport-width", header::HeaderValue::from(config.viewport_width));

        let client = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.page_timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(CrawlError::Session)?;

        tracing::debug!(
            viewport_width = config.viewport_width,
            viewport_height = config.viewport_height,
            "browser session opened"
        );
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        // Servers that omit the header are given the benefit of the doubt.
        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(FetchError::NotHtml(content_type));
        }

        let final_url = Url::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());
        let html = response.text().await?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            html,
        })
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        tracing::debug!("browser session closed");
    }
}
