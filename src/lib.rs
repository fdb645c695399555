pub mod ai_review;
pub mod config;
pub mod cursor;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod github;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod summary;
pub mod threads;

#[cfg(test)]
mod tests;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{AppError, AppResult};
use github::GitHubClient;
use models::{UnresolvedCommentsRequest, UnresolvedCommentsResponse};

/// Installs the stderr subscriber; stdout is reserved for tool output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Tool handler: unresolved review feedback for one pull request.
pub async fn find_unresolved_comments(
    request: UnresolvedCommentsRequest,
) -> AppResult<UnresolvedCommentsResponse> {
    let config = Config::from_env()?;
    let client = GitHubClient::new(&config)?;
    pipeline::get_unresolved_comments(&client, &config, &request).await
}

async fn handle_stdin_request() -> AppResult<UnresolvedCommentsResponse> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let request: UnresolvedCommentsRequest = serde_json::from_str(&input)
        .map_err(|err| AppError::invalid_parameter(format!("malformed request: {err}")))?;
    find_unresolved_comments(request).await
}

/// Reads one JSON request from stdin and writes the JSON response (or error) to stdout.
pub fn run() -> i32 {
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start async runtime");
            return 1;
        }
    };

    runtime.block_on(async {
        let (output, code) = match handle_stdin_request().await {
            Ok(response) => (serde_json::to_value(&response).map_err(AppError::from), 0),
            Err(err) => {
                tracing::error!(error = %err, category = ?err.category(), "request failed");
                (
                    Ok(json!({
                        "error": {
                            "category": err.category(),
                            "message": err.to_string(),
                        }
                    })),
                    1,
                )
            }
        };

        let rendered = match output.and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, "failed to render response");
                return 1;
            }
        };

        let mut stdout = tokio::io::stdout();
        if stdout.write_all(rendered.as_bytes()).await.is_err()
            || stdout.write_all(b"\n").await.is_err()
            || stdout.flush().await.is_err()
        {
            return 1;
        }
        code
    })
}
