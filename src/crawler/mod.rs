//! Page crawling plus LLM extraction.
//!
//! `Crawler` is the seam the HTTP layer talks to. `HttpCrawler` fetches the
//! page over plain HTTP (no JavaScript), converts it to markdown and, when a
//! strategy is configured, asks the LLM for schema-shaped JSON.

pub mod page;
pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use url::Url;

use crate::extraction::LlmExtractionStrategy;
use page::PageContent;
pub use session::{BrowserSession, FetchError, FetchedPage};

pub const DEFAULT_EXCLUDED_TAGS: &[&str] = &["iframe", "nav", "header", "footer"];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("failed to open browser session: {0}")]
    Session(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub page_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-call settings. There is no cache, so every run hits the network.
#[derive(Debug, Clone)]
pub struct CrawlerRunConfig {
    pub extraction_strategy: Option<LlmExtractionStrategy>,
    pub excluded_tags: Vec<String>,
}

impl Default for CrawlerRunConfig {
    fn default() -> Self {
        Self {
            extraction_strategy: None,
            excluded_tags: DEFAULT_EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CrawlerRunConfig {
    pub fn with_extraction(strategy: LlmExtractionStrategy) -> Self {
        Self {
            extraction_strategy: Some(strategy),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub url: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub markdown: Option<String>,
    /// Whatever the extraction step produced: usually a JSON string, but
    /// stub or alternate crawlers may hand back arrays or objects.
    pub extracted_content: Option<Value>,
    pub links: Vec<String>,
    pub metadata: Map<String, Value>,
    pub error_message: Option<String>,
}

impl CrawlResult {
    pub fn failed(url: &Url, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait Crawler: Send + Sync {
    /// Page-level failures come back as `success: false`. `Err` is reserved
    /// for faults in the crawler itself.
    async fn arun(&self, url: &Url, config: &CrawlerRunConfig) -> Result<CrawlResult, CrawlError>;
}

pub struct HttpCrawler {
    browser: BrowserConfig,
    llm_client: Client,
}

impl HttpCrawler {
    pub fn new(browser: BrowserConfig) -> Result<Self, CrawlError> {
        let llm_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(CrawlError::Session)?;

        Ok(Self { browser, llm_client })
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    async fn arun(&self, url: &Url, config: &CrawlerRunConfig) -> Result<CrawlResult, CrawlError> {
        let session = BrowserSession::open(&self.browser)?;

        tracing::info!(%url, "fetching page");
        let page = match session.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(%url, error = %e, "page fetch failed");
                return Ok(CrawlResult::failed(url, e.to_string()));
            }
        };
        drop(session);

        let content = PageContent::parse(&page.html, &page.final_url, &config.excluded_tags);
        tracing::debug!(
            %url,
            markdown_len = content.markdown.len(),
            links = content.links.len(),
            "page converted"
        );

        let mut result = CrawlResult {
            url: page.final_url.to_string(),
            success: true,
            status_code: Some(page.status_code),
            markdown: Some(content.markdown),
            extracted_content: None,
            links: content.links,
            metadata: content.metadata,
            error_message: None,
        };

        let Some(strategy) = &config.extraction_strategy else {
            return Ok(result);
        };

        let markdown = result.markdown.as_deref().unwrap_or_default();
        match strategy.extract(&self.llm_client, markdown).await {
            Ok(raw) => {
                tracing::debug!(%url, extracted_len = raw.len(), "extraction complete");
                result.extracted_content = Some(Value::String(raw));
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "extraction failed");
                result.success = false;
                result.error_message = Some(e.to_string());
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_excludes_chrome_by_default() {
        let config = CrawlerRunConfig::default();
        assert_eq!(config.excluded_tags, vec!["iframe", "nav", "header", "footer"]);
        assert!(config.extraction_strategy.is_none());
    }

    #[test]
    fn browser_defaults_match_desktop_viewport() {
        let browser = BrowserConfig::default();
        assert_eq!((browser.viewport_width, browser.viewport_height), (1280, 720));
    }

    #[test]
    fn failed_result_carries_message() {
        let url = Url::parse("https://example.com/a").unwrap();
        let result = CrawlResult::failed(&url, "Page returned HTTP 404");
        assert!(!result.success);
        assert_eq!(result.url, "https://example.com/a");
        assert_eq!(result.error_message.as_deref(), Some("Page returned HTTP 404"));
        assert!(result.extracted_content.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failed_result_not_an_error() {
        let crawler = HttpCrawler::new(BrowserConfig {
            page_timeout: Duration::from_secs(2),
            ..BrowserConfig::default()
        })
        .unwrap();
        // Port 9 (discard) on loopback is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/").unwrap();

        let result = crawler.arun(&url, &CrawlerRunConfig::default()).await.unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("Failed to fetch page"));
    }

    mod local_server {
        use axum::{
            Json, Router,
            http::{StatusCode, header},
            response::Html,
            routing::{get, post},
        };
        use serde_json::json;

        const ARTICLE: &str = "<html><head><title>Notes</title></head>\
            <body><nav>Menu</nav><p>Hello from the article.</p></body></html>";

        /// Serves pages and fake LLM endpoints on an ephemeral port.
        pub async fn spawn() -> String {
            let app = Router::new()
                .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
                .route(
                    "/report.pdf",
                    get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }),
                )
                .route("/article", get(|| async { Html(ARTICLE) }))
                .route(
                    "/llm-unauthorized/chat/completions",
                    post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
                )
                .route(
                    "/llm-empty/chat/completions",
                    post(|| async { Json(json!({"choices": [{"message": {"role": "assistant"}}]})) }),
                )
                .route(
                    "/llm-ok/chat/completions",
                    post(|| async {
                        Json(json!({"choices": [{"message": {
                            "role": "assistant",
                            "content": "{\"content\":\"Hi\",\"main_content_image_urls\":[]}"
                        }}]}))
                    }),
                );

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }
    }

    fn strategy_at(base_url: String) -> CrawlerRunConfig {
        let llm = crate::llm::LlmConfig::new(crate::llm::DEFAULT_PROVIDER, "sk-test")
            .with_base_url(base_url);
        CrawlerRunConfig::with_extraction(LlmExtractionStrategy::new(
            llm,
            crate::extraction::extraction_schema(false, false),
        ))
    }

    #[tokio::test]
    async fn page_and_llm_failures_are_failed_results() {
        let base = local_server::spawn().await;
        let crawler = HttpCrawler::new(BrowserConfig::default()).unwrap();
        let page = |path: &str| Url::parse(&format!("{base}{path}")).unwrap();

        let result = crawler
            .arun(&page("/missing"), &CrawlerRunConfig::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("Page returned HTTP 404"));

        let result = crawler
            .arun(&page("/report.pdf"), &CrawlerRunConfig::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Page is not HTML (content-type: application/pdf)")
        );

        let result = crawler
            .arun(&page("/article"), &strategy_at(format!("{base}/llm-unauthorized")))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("LLM provider returned 401: bad key")
        );
        // the page itself was fetched before extraction failed
        assert!(result.markdown.unwrap().contains("Hello from the article."));

        let result = crawler
            .arun(&page("/article"), &strategy_at(format!("{base}/llm-empty")))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Invalid response format from LLM")
        );
    }

    #[tokio::test]
    async fn extraction_reply_is_kept_as_raw_string() {
        let base = local_server::spawn().await;
        let crawler = HttpCrawler::new(BrowserConfig::default()).unwrap();
        let url = Url::parse(&format!("{base}/article")).unwrap();

        let result = crawler
            .arun(&url, &strategy_at(format!("{base}/llm-ok")))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.url, url.as_str());
        assert_eq!(
            result.extracted_content,
            Some(Value::String(
                "{\"content\":\"Hi\",\"main_content_image_urls\":[]}".to_string()
            ))
        );
        let markdown = result.markdown.unwrap();
        assert!(markdown.contains("Hello from the article."));
        assert!(!markdown.contains("Menu"));
        assert_eq!(result.metadata["title"], "Notes");
    }
}
