use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Absolute `http`/`https` URL with a host. Anything else fails to
/// deserialize, which the JSON extractor reports as 422.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct HttpUrl(Url);

impl HttpUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for HttpUrl {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let url = Url::parse(raw.trim()).map_err(|e| format!("invalid URL: {}", e))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(format!("URL scheme should be 'http' or 'https', got '{}'", other)),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err("URL host is required".to_string());
        }
        Ok(HttpUrl(url))
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub url: HttpUrl,
    #[serde(default, alias = "api_key")]
    pub deepseek_api_key: Option<String>,
    #[serde(default)]
    pub include_metadata: bool,
    #[serde(default)]
    pub include_links: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct ExtractResponse {
    pub success: bool,
    pub content: Option<String>,
    pub main_content_image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    pub markdown: Option<String>,
    pub error_message: Option<String>,
    pub processing_time: Option<f64>,
}
