use std::io;

use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("{0}")]
    SsoAuthorizationRequired(String),
    #[error("graphql error: {0}")]
    GraphQl(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("secure storage error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("operation timed out")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout
    }
}

/// Caller-facing failure classes used by the tool layer to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UserError,
    Authentication,
    Authorization,
    RateLimit,
    Network,
    Unknown,
}

impl AppError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        AppError::InvalidParameter(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidParameter(_) => ErrorCategory::UserError,
            AppError::MissingConfig(_) => ErrorCategory::Authentication,
            AppError::RateLimited(_) => ErrorCategory::RateLimit,
            AppError::SsoAuthorizationRequired(_) => ErrorCategory::Authorization,
            AppError::Api { status, .. } => match status {
                401 => ErrorCategory::Authentication,
                403 => ErrorCategory::Authorization,
                429 => ErrorCategory::RateLimit,
                400 | 404 | 422 => ErrorCategory::UserError,
                _ => ErrorCategory::Unknown,
            },
            AppError::Http(err) => {
                if err.is_timeout() || err.is_connect() || err.is_request() {
                    ErrorCategory::Network
                } else {
                    match err.status().map(|status| status.as_u16()) {
                        Some(401) => ErrorCategory::Authentication,
                        Some(403) => ErrorCategory::Authorization,
                        Some(429) => ErrorCategory::RateLimit,
                        _ => ErrorCategory::Unknown,
                    }
                }
            }
            AppError::Timeout => ErrorCategory::Network,
            AppError::GraphQl(_)
            | AppError::Serde(_)
            | AppError::Url(_)
            | AppError::Io(_)
            | AppError::Keyring(_) => ErrorCategory::Unknown,
        }
    }
}
