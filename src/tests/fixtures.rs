// Shared fixtures: raw GitHub payloads, normalized comments and an in-memory source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::github::{
    GitHubIssueComment, GitHubReview, GitHubReviewComment, PullRequestSource, ReviewThread,
    ReviewThreadsPage,
};
use crate::models::{Comment, CommentType, PullRequestRef};
use crate::normalize::build_action_commands;

pub fn pr() -> PullRequestRef {
    PullRequestRef {
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        number: 42,
    }
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
}

pub fn config() -> Config {
    Config {
        token: "test-token".to_string(),
        api_base: "https://api.github.com".to_string(),
        graphql_url: "https://api.github.com/graphql".to_string(),
        page_size: 20,
        priority_scoring: true,
        parse_ai_reviews: true,
        http_timeout: Duration::from_secs(5),
    }
}

pub fn review_comment(id: u64, login: &str, minute: u32) -> GitHubReviewComment {
    serde_json::from_value(json!({
        "id": id,
        "body": format!("inline comment {id}"),
        "path": "src/lib.rs",
        "line": 10,
        "original_line": 10,
        "position": 4,
        "diff_hunk": "@@ -1,3 +1,4 @@",
        "user": { "login": login, "type": "User" },
        "author_association": "MEMBER",
        "html_url": format!("https://github.com/acme/widgets/pull/42#discussion_r{id}"),
        "created_at": at(minute).to_rfc3339(),
        "updated_at": at(minute).to_rfc3339(),
    }))
    .unwrap()
}

pub fn reply_comment(id: u64, login: &str, parent: u64, minute: u32) -> GitHubReviewComment {
    let mut reply = review_comment(id, login, minute);
    reply.in_reply_to_id = Some(parent);
    reply
}

pub fn issue_comment(id: u64, login: &str, user_type: &str, minute: u32) -> GitHubIssueComment {
    serde_json::from_value(json!({
        "id": id,
        "body": format!("general comment {id}"),
        "user": { "login": login, "type": user_type },
        "html_url": format!("https://github.com/acme/widgets/pull/42#issuecomment-{id}"),
        "created_at": at(minute).to_rfc3339(),
        "updated_at": at(minute).to_rfc3339(),
        "reactions": { "total_count": 0 },
    }))
    .unwrap()
}

pub fn review(id: u64, login: &str, body: &str) -> GitHubReview {
    serde_json::from_value(json!({
        "id": id,
        "body": body,
        "user": { "login": login, "type": "Bot" },
        "author_association": "NONE",
        "state": "COMMENTED",
        "html_url": format!("https://github.com/acme/widgets/pull/42#pullrequestreview-{id}"),
        "submitted_at": at(30).to_rfc3339(),
    }))
    .unwrap()
}

/// A general comment built directly in normalized form.
pub fn comment(id: i64, author: &str, minute: u32) -> Comment {
    let html_url = format!("https://github.com/acme/widgets/pull/42#issuecomment-{id}");
    Comment {
        id,
        comment_type: CommentType::GeneralComment,
        author: author.to_string(),
        author_association: "NONE".to_string(),
        is_bot: false,
        created_at: at(minute),
        updated_at: at(minute),
        file_path: None,
        line_number: None,
        start_line: None,
        diff_hunk: None,
        body: "looks good".to_string(),
        in_reply_to_id: None,
        outdated: None,
        reactions: None,
        html_url: html_url.clone(),
        action_commands: build_action_commands(
            &pr(),
            CommentType::GeneralComment,
            id,
            &html_url,
            None,
        ),
        ai_review_metadata: None,
        status_indicators: None,
    }
}

/// An inline comment with an open thread, so it carries a structured resolve action.
pub fn inline_with_thread(id: i64, author: &str, minute: u32, thread: &str) -> Comment {
    let mut inline = comment(id, author, minute);
    inline.comment_type = CommentType::InlineReviewComment;
    inline.file_path = Some("src/lib.rs".to_string());
    inline.line_number = Some(10);
    inline.outdated = Some(false);
    inline.action_commands = build_action_commands(
        &pr(),
        CommentType::InlineReviewComment,
        id,
        &inline.html_url,
        Some(thread),
    );
    inline
}

pub fn thread(id: &str, resolved: bool, comment_ids: &[u64]) -> ReviewThread {
    ReviewThread {
        id: id.to_string(),
        is_resolved: resolved,
        comment_ids: comment_ids.to_vec(),
    }
}

pub fn page(threads: Vec<ReviewThread>, next: Option<&str>) -> ReviewThreadsPage {
    ReviewThreadsPage {
        threads,
        has_next_page: next.is_some(),
        end_cursor: next.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub review_comments: Vec<GitHubReviewComment>,
    pub issue_comments: Vec<GitHubIssueComment>,
    pub reviews: Vec<GitHubReview>,
    /// Pages keyed by the `after` cursor that requests them (`None` for the first page).
    pub thread_pages: Vec<(Option<String>, ReviewThreadsPage)>,
    pub fail_threads: bool,
    pub fail_issue_comments: bool,
    pub thread_calls: AtomicUsize,
    pub review_calls: AtomicUsize,
    pub source_calls: AtomicUsize,
}

impl FakeSource {
    pub fn thread_calls(&self) -> usize {
        self.thread_calls.load(Ordering::SeqCst)
    }

    pub fn review_calls(&self) -> usize {
        self.review_calls.load(Ordering::SeqCst)
    }

    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }
}

impl PullRequestSource for FakeSource {
    async fn list_review_comments(
        &self,
        _pr: &PullRequestRef,
    ) -> AppResult<Vec<GitHubReviewComment>> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.review_comments.clone())
    }

    async fn list_issue_comments(&self, _pr: &PullRequestRef) -> AppResult<Vec<GitHubIssueComment>> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_issue_comments {
            return Err(AppError::Api {
                status: 404,
                message: "list issue comments failed with status 404. Not Found".to_string(),
            });
        }
        Ok(self.issue_comments.clone())
    }

    async fn list_reviews(&self, _pr: &PullRequestRef) -> AppResult<Vec<GitHubReview>> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reviews.clone())
    }

    async fn review_threads_page(
        &self,
        _pr: &PullRequestRef,
        after: Option<&str>,
    ) -> AppResult<ReviewThreadsPage> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_threads {
            return Err(AppError::GraphQl("Something went wrong".to_string()));
        }
        Ok(self
            .thread_pages
            .iter()
            .find(|(key, _)| key.as_deref() == after)
            .map(|(_, page)| page.clone())
            .unwrap_or_default())
    }
}
