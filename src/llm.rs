use reqwest::Client;
use serde::Serialize;
use serde_json::json;

pub const DEFAULT_PROVIDER: &str = "deepseek/deepseek-chat";
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format from LLM")]
    InvalidResponse,
}

/// Provider, credential and endpoint for one extraction call.
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub api_token: String,
    pub base_url: String,
}

impl LlmConfig {
    pub fn new(provider: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model name with the `vendor/` prefix stripped.
    pub fn model(&self) -> &str {
        self.provider
            .split_once('/')
            .map_or(self.provider.as_str(), |(_, model)| model)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: serde_json::Value,
    temperature: f32,
}

/// Sends a system + user prompt and returns the raw JSON text of the reply.
pub async fn chat_json(
    client: &Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, LlmError> {
    let body = ChatRequest {
        model: config.model(),
        messages: vec![
            Message {
                role: "system",
                content: system,
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        response_format: json!({ "type": "json_object" }),
        temperature: 0.0,
    };

    tracing::debug!(model = config.model(), prompt_len = user.len(), "calling LLM");

    let res = client
        .post(config.completions_url())
        .bearer_auth(&config.api_token)
        .json(&body)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(LlmError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let json: serde_json::Value = res.json().await?;
    let reply = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::InvalidResponse)?
        .to_string();

    Ok(reply)
}
