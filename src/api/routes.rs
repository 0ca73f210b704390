use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::api::models::{ExtractRequest, ExtractResponse};
use crate::api::response;
use crate::crawler::CrawlerRunConfig;
use crate::error::{AppError, Result};
use crate::extraction::{LlmExtractionStrategy, extraction_schema};
use crate::llm::LlmConfig;
use crate::normalize::ExtractedFields;

pub const SERVICE_NAME: &str = "crawl-extract-api";

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/extract", post(extract_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Crawl extraction API is running! Use POST /extract to crawl a webpage."
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn extract_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let start_time = Instant::now();
    tracing::info!(url = %req.url, "processing extract request");

    let api_key = resolve_api_key(
        &headers,
        req.deepseek_api_key.as_deref(),
        state.config.deepseek_api_key.as_deref(),
    )
    .ok_or(AppError::MissingApiKey)?;

    let llm = LlmConfig::new(state.config.llm_provider.clone(), api_key)
        .with_base_url(state.config.llm_base_url.clone());
    let strategy = LlmExtractionStrategy::new(
        llm,
        extraction_schema(req.include_metadata, req.include_links),
    );
    let run_config = CrawlerRunConfig::with_extraction(strategy);

    let result = tokio::time::timeout(
        state.config.crawl_timeout,
        state.crawler.arun(req.url.as_url(), &run_config),
    )
    .await
    .map_err(|_| {
        tracing::warn!(url = %req.url, elapsed = ?start_time.elapsed(), "crawl timed out");
        AppError::Timeout
    })??;

    let processing_time = start_time.elapsed().as_secs_f64();

    if !result.success {
        let message = result
            .error_message
            .unwrap_or_else(|| "Crawl failed without an error message".to_string());
        return Err(AppError::CrawlFailed(message));
    }

    let mut fields = ExtractedFields::from_payload(
        result.extracted_content.as_ref(),
        req.include_metadata,
        req.include_links,
    );
    // Fall back to what the crawler saw on the page itself.
    if req.include_metadata && fields.metadata.is_none() {
        fields.metadata = Some(result.metadata);
    }
    if req.include_links && fields.links.is_none() {
        fields.links = Some(result.links);
    }

    tracing::info!(
        url = %req.url,
        final_url = %result.url,
        status_code = ?result.status_code,
        processing_time,
        content_len = fields.content.len(),
        images = fields.image_urls.len(),
        "extract request complete"
    );

    Ok(response::success(ExtractResponse {
        success: true,
        content: Some(fields.content),
        main_content_image_urls: fields.image_urls,
        metadata: fields.metadata,
        links: fields.links,
        markdown: result.markdown,
        error_message: None,
        processing_time: Some(processing_time),
    }))
}

/// Bearer header, then request body, then the configured fallback. Blank
/// values are skipped.
pub fn resolve_api_key(
    headers: &HeaderMap,
    body_key: Option<&str>,
    fallback: Option<&str>,
) -> Option<String> {
    let header_key = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token)
        });

    [header_key, body_key, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn header_wins_over_body_and_env() {
        let key = resolve_api_key(&bearer("Bearer sk-header"), Some("sk-body"), Some("sk-env"));
        assert_eq!(key.as_deref(), Some("sk-header"));
    }

    #[test]
    fn body_wins_over_env() {
        let key = resolve_api_key(&HeaderMap::new(), Some("sk-body"), Some("sk-env"));
        assert_eq!(key.as_deref(), Some("sk-body"));
    }

    #[test]
    fn env_is_last_resort() {
        let key = resolve_api_key(&HeaderMap::new(), Some("  "), Some("sk-env"));
        assert_eq!(key.as_deref(), Some("sk-env"));
        assert_eq!(resolve_api_key(&HeaderMap::new(), None, None), None);
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let key = resolve_api_key(&bearer("Basic dXNlcjpwdw=="), None, None);
        assert_eq!(key, None);
        let key = resolve_api_key(&bearer("bearer  sk-lower "), None, None);
        assert_eq!(key.as_deref(), Some("sk-lower"));
    }
}
