use std::sync::Arc;

use crawl_extract_api::{
    AppState, api::routes::create_router, config::Config, crawler::HttpCrawler,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = Config::load()?;
    let server_addr = config.server_addr;
    if config.deepseek_api_key.is_none() {
        tracing::warn!("DEEPSEEK_API_KEY not set; requests must supply their own key");
    }

    let crawler = HttpCrawler::new(config.browser.clone())?;
    let app_state = AppState {
        config: Arc::new(config),
        crawler: Arc::new(crawler),
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
