use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{PullRequestRef, Reactions};

const USER_AGENT_VALUE: &str = "pr-feedback/0.1";
const API_VERSION: &str = "2022-11-28";
const REST_PAGE_SIZE: &str = "100";
pub const THREAD_PAGE_SIZE: u32 = 100;

const REVIEW_THREADS_QUERY: &str = r#"
query ReviewThreads($owner: String!, $repo: String!, $number: Int!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $repo) {
    pullRequest(number: $number) {
      reviewThreads(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          isResolved
          comments(first: 100) { nodes { databaseId } }
        }
      }
    }
  }
}
"#;

/// The upstream calls the comment pipeline depends on.
#[allow(async_fn_in_trait)]
pub trait PullRequestSource {
    async fn list_review_comments(&self, pr: &PullRequestRef)
        -> AppResult<Vec<GitHubReviewComment>>;
    async fn list_issue_comments(&self, pr: &PullRequestRef) -> AppResult<Vec<GitHubIssueComment>>;
    async fn list_reviews(&self, pr: &PullRequestRef) -> AppResult<Vec<GitHubReview>>;
    async fn review_threads_page(
        &self,
        pr: &PullRequestRef,
        after: Option<&str>,
    ) -> AppResult<ReviewThreadsPage>;
}

struct SsoHeaderInfo {
    organization: Option<String>,
    authorization_url: Option<String>,
}

fn parse_sso_header(header: &HeaderValue) -> Option<SsoHeaderInfo> {
    let value = header.to_str().ok()?;
    let mut organization = None;
    let mut authorization_url = None;

    for part in value.split(';') {
        let trimmed = part.trim();
        if let Some(rest) = trimmed.strip_prefix("organization=") {
            organization = Some(rest.trim_matches(|c| c == '\"').to_string());
        } else if let Some(rest) = trimmed.strip_prefix("url=") {
            authorization_url = Some(rest.trim_matches(|c| c == '\"').to_string());
        }
    }

    if organization.is_some() || authorization_url.is_some() {
        Some(SsoHeaderInfo {
            organization,
            authorization_url,
        })
    } else {
        None
    }
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
}

async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers().clone();

    if is_rate_limited(status, &headers) {
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        warn!(context, status = status.as_u16(), reset, "GitHub rate limit exceeded");
        return Err(AppError::RateLimited(format!(
            "{context}: GitHub rate limit exceeded (resets at {reset})"
        )));
    }

    if status == StatusCode::FORBIDDEN {
        if let Some(info) = headers.get("x-github-sso").and_then(parse_sso_header) {
            warn!(
                context,
                organization = info.organization.as_deref().unwrap_or("unknown"),
                "GitHub SSO authorization required"
            );

            let mut message = String::from("GitHub SSO authorization required.");
            if let Some(org) = info.organization.as_deref() {
                message.push_str(&format!(" Authorize access for organization `{org}`."));
            }
            if let Some(url) = info.authorization_url.as_deref() {
                message.push_str(&format!(" Visit {url} to approve this token."));
            }
            return Err(AppError::SsoAuthorizationRequired(message));
        }
    }

    let body = response.text().await.unwrap_or_default();

    let mut message = match serde_json::from_str::<GitHubApiError>(&body) {
        Ok(api_error) => {
            let mut message = api_error
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GitHub API returned an error.".to_string());
            if let Some(url) = api_error
                .documentation_url
                .as_deref()
                .filter(|v| !v.is_empty())
            {
                message.push_str(&format!(" See {url} for details."));
            }
            message
        }
        Err(_) if !body.is_empty() => format!("Response: {body}"),
        Err(_) => String::new(),
    };

    if let Some(required_scopes) = headers
        .get("x-accepted-oauth-scopes")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        message.push_str(&format!(" Required scopes: {required_scopes}."));
    }

    warn!(
        context,
        status = status.as_u16(),
        error_message = %message,
        "GitHub API request failed"
    );

    Err(AppError::Api {
        status: status.as_u16(),
        message: format!(
            "{context} failed with status {}. {}",
            status.as_u16(),
            message.trim()
        )
        .trim_end()
        .to_string(),
    })
}

/// Extracts the `rel="next"` target from an RFC 5988 `Link` header.
pub fn next_page_url(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    value.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if is_next {
            Some(target.trim_start_matches('<').trim_end_matches('>').to_string())
        } else {
            None
        }
    })
}

pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    graphql_url: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|_| AppError::MissingConfig("invalid access token"))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            graphql_url: config.graphql_url.clone(),
        })
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> AppResult<Vec<T>> {
        let mut collected = Vec::new();
        let mut request = self
            .client
            .get(format!("{}{path}", self.api_base))
            .query(&[("per_page", REST_PAGE_SIZE)]);
        let mut page = 1u32;

        loop {
            let response = ensure_success(request.send().await?, context).await?;
            let next = next_page_url(response.headers());
            let items = response.json::<Vec<T>>().await?;
            debug!(context, page, count = items.len(), "fetched page");
            collected.extend(items);

            match next {
                Some(url) => {
                    request = self.client.get(url);
                    page += 1;
                }
                None => break,
            }
        }

        Ok(collected)
    }
}

impl PullRequestSource for GitHubClient {
    async fn list_review_comments(
        &self,
        pr: &PullRequestRef,
    ) -> AppResult<Vec<GitHubReviewComment>> {
        self.get_all_pages(
            &format!("/repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number),
            &format!("list review comments for {pr}"),
        )
        .await
    }

    async fn list_issue_comments(&self, pr: &PullRequestRef) -> AppResult<Vec<GitHubIssueComment>> {
        self.get_all_pages(
            &format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number),
            &format!("list issue comments for {pr}"),
        )
        .await
    }

    async fn list_reviews(&self, pr: &PullRequestRef) -> AppResult<Vec<GitHubReview>> {
        self.get_all_pages(
            &format!("/repos/{}/{}/pulls/{}/reviews", pr.owner, pr.repo, pr.number),
            &format!("list reviews for {pr}"),
        )
        .await
    }

    async fn review_threads_page(
        &self,
        pr: &PullRequestRef,
        after: Option<&str>,
    ) -> AppResult<ReviewThreadsPage> {
        let context = format!("query review threads for {pr}");
        let response = self
            .client
            .post(&self.graphql_url)
            .json(&json!({
                "query": REVIEW_THREADS_QUERY,
                "variables": {
                    "owner": pr.owner,
                    "repo": pr.repo,
                    "number": pr.number,
                    "first": THREAD_PAGE_SIZE,
                    "after": after,
                },
            }))
            .send()
            .await?;
        let response = ensure_success(response, &context).await?;
        let payload = response
            .json::<GraphQlResponse<ReviewThreadsData>>()
            .await?;
        payload.into_threads_page()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
}

impl GitHubUser {
    pub fn is_bot(&self) -> bool {
        self.user_type
            .as_deref()
            .map(|kind| kind.eq_ignore_ascii_case("bot"))
            .unwrap_or(false)
            || self.login.ends_with("[bot]")
    }
}

#[derive(Debug, Deserialize)]
struct GitHubApiError {
    message: Option<String>,
    documentation_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReviewComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub path: String,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub original_line: Option<u64>,
    #[serde(default)]
    pub start_line: Option<u64>,
    #[serde(default)]
    pub original_start_line: Option<u64>,
    #[serde(default)]
    pub position: Option<u64>,
    #[serde(default)]
    pub diff_hunk: Option<String>,
    #[serde(default)]
    pub in_reply_to_id: Option<u64>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub author_association: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Option<Reactions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub author_association: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Option<Reactions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub author_association: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// One page of review threads, flattened from the GraphQL shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewThreadsPage {
    pub threads: Vec<ReviewThread>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewThread {
    pub id: String,
    pub is_resolved: bool,
    pub comment_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewThreadsData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    pull_request: Option<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    review_threads: ReviewThreadConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewThreadConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<ReviewThreadNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewThreadNode {
    id: String,
    is_resolved: bool,
    comments: ThreadCommentConnection,
}

#[derive(Debug, Deserialize)]
struct ThreadCommentConnection {
    #[serde(default)]
    nodes: Vec<Option<ThreadCommentNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadCommentNode {
    database_id: Option<u64>,
}

impl GraphQlResponse<ReviewThreadsData> {
    pub fn into_threads_page(self) -> AppResult<ReviewThreadsPage> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            let joined = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::GraphQl(joined));
        }

        let connection = self
            .data
            .and_then(|data| data.repository)
            .and_then(|repo| repo.pull_request)
            .map(|pr| pr.review_threads)
            .ok_or_else(|| AppError::GraphQl("pull request not found in response".into()))?;

        let threads = connection
            .nodes
            .into_iter()
            .flatten()
            .map(|node| ReviewThread {
                id: node.id,
                is_resolved: node.is_resolved,
                comment_ids: node
                    .comments
                    .nodes
                    .into_iter()
                    .flatten()
                    .filter_map(|c| c.database_id)
                    .collect(),
            })
            .collect();

        Ok(ReviewThreadsPage {
            threads,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }
}
