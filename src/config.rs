use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::Database;

pub const DEFAULT_SEARCH_URL: &str = "https://www.saramin.co.kr/zf_user/search/recruit";
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.saramin.co.kr";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

// Runtime configuration, read from the environment with built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub search_url: String,
    pub site_origin: String,
    pub user_agent: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: Database::default_path(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            db_path: env::var("JOBBOARD_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            search_url: env::var("JOBBOARD_SEARCH_URL").unwrap_or(defaults.search_url),
            site_origin: env::var("JOBBOARD_SITE_ORIGIN").unwrap_or(defaults.site_origin),
            user_agent: env::var("JOBBOARD_USER_AGENT").unwrap_or(defaults.user_agent),
            request_delay: match env::var("JOBBOARD_DELAY_MS") {
                Ok(ms) => Duration::from_millis(
                    ms.parse().context("JOBBOARD_DELAY_MS must be a number of milliseconds")?,
                ),
                Err(_) => defaults.request_delay,
            },
            request_timeout: match env::var("JOBBOARD_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse().context("JOBBOARD_TIMEOUT_SECS must be a number of seconds")?,
                ),
                Err(_) => defaults.request_timeout,
            },
        })
    }
}
