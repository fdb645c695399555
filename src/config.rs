use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::storage::read_token;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_base: String,
    pub graphql_url: String,
    /// Server-side page size; caller-supplied sizes are clamped to this.
    pub page_size: u32,
    pub priority_scoring: bool,
    pub parse_ai_reviews: bool,
    pub http_timeout: Duration,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment. The token falls back
    /// to the OS keychain when neither `GITHUB_TOKEN` nor `GH_TOKEN` is set.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_lookup(|key| env::var(key).ok());
        if config.token.is_empty() {
            config.token = read_token()?.ok_or(AppError::MissingConfig("GITHUB_TOKEN"))?;
        }
        Ok(config)
    }

    /// Builds a config from an arbitrary variable source. The token is left empty when absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = non_empty("GITHUB_TOKEN")
            .or_else(|| non_empty("GH_TOKEN"))
            .unwrap_or_default();
        let api_base = non_empty("GITHUB_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let graphql_url =
            non_empty("GITHUB_GRAPHQL_URL").unwrap_or_else(|| format!("{api_base}/graphql"));

        let page_size = parse_or_default(
            "PR_FEEDBACK_PAGE_SIZE",
            non_empty("PR_FEEDBACK_PAGE_SIZE"),
            DEFAULT_PAGE_SIZE,
        )
        .clamp(1, MAX_PAGE_SIZE);
        let priority_scoring = parse_or_default(
            "PR_FEEDBACK_PRIORITY_SCORING",
            non_empty("PR_FEEDBACK_PRIORITY_SCORING"),
            true,
        );
        let parse_ai_reviews = parse_or_default(
            "PR_FEEDBACK_PARSE_AI_REVIEWS",
            non_empty("PR_FEEDBACK_PARSE_AI_REVIEWS"),
            true,
        );
        let timeout_secs = parse_or_default(
            "PR_FEEDBACK_HTTP_TIMEOUT_SECS",
            non_empty("PR_FEEDBACK_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        );

        Self {
            token,
            api_base,
            graphql_url,
            page_size,
            priority_scoring,
            parse_ai_reviews,
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable configuration value");
            default
        }
    }
}
