pub mod api;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod normalize;

use std::sync::Arc;

use config::Config;
use crawler::Crawler;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub crawler: Arc<dyn Crawler>,
}
