use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::crawler::BrowserConfig;
use crate::error::{AppError, Result};
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_PROVIDER};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    /// Used when a request carries no key of its own.
    pub deepseek_api_key: Option<String>,
    pub llm_provider: String,
    pub llm_base_url: String,
    pub crawl_timeout: Duration,
    pub browser: BrowserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8001),
            deepseek_api_key: None,
            llm_provider: DEFAULT_PROVIDER.to_string(),
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            crawl_timeout: Duration::from_secs(90),
            browser: BrowserConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `load` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("PORT").unwrap_or_else(|| "8001".to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let crawl_timeout = match var("CRAWL_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|e| AppError::ConfigError(format!("Invalid CRAWL_TIMEOUT_SECS: {}", e)))?;
                if secs == 0 {
                    return Err(AppError::ConfigError(
                        "CRAWL_TIMEOUT_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.crawl_timeout,
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            deepseek_api_key: var("DEEPSEEK_API_KEY"),
            llm_provider: var("LLM_PROVIDER").unwrap_or(defaults.llm_provider),
            llm_base_url: var("DEEPSEEK_BASE_URL").unwrap_or(defaults.llm_base_url),
            crawl_timeout,
            browser: defaults.browser,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_addr.to_string(), "0.0.0.0:8001");
        assert!(config.deepseek_api_key.is_none());
        assert_eq!(config.llm_provider, "deepseek/deepseek-chat");
        assert_eq!(config.llm_base_url, "https://api.deepseek.com");
        assert_eq!(config.crawl_timeout, Duration::from_secs(90));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("DEEPSEEK_API_KEY", " sk-env "),
            ("CRAWL_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.deepseek_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.crawl_timeout, Duration::from_secs(15));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("DEEPSEEK_API_KEY", "   ")])).unwrap();
        assert!(config.deepseek_api_key.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(AppError::ConfigError(_))
        ));
        assert!(Config::from_lookup(lookup(&[("HOST", "localhost:1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CRAWL_TIMEOUT_SECS", "0")])).is_err());
    }
}
