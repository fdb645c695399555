use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestRef {
    /// Accepts `owner/repo#123`, `owner/repo/123` or a github.com pull request URL.
    pub fn parse(input: &str) -> AppResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_parameter("pull request identifier is empty"));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|_| invalid_pr(input))?;
            let segments: Vec<&str> = url
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).collect())
                .unwrap_or_default();
            return match segments.as_slice() {
                [owner, repo, "pull", number, ..] => Self::from_parts(owner, repo, number, input),
                _ => Err(invalid_pr(input)),
            };
        }

        if let Some((slug, number)) = trimmed.split_once('#') {
            let (owner, repo) = slug.split_once('/').ok_or_else(|| invalid_pr(input))?;
            return Self::from_parts(owner, repo, number, input);
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        match parts.as_slice() {
            [owner, repo, number] => Self::from_parts(owner, repo, number, input),
            _ => Err(invalid_pr(input)),
        }
    }

    fn from_parts(owner: &str, repo: &str, number: &str, input: &str) -> AppResult<Self> {
        let owner = owner.trim();
        let repo = repo.trim();
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid_pr(input));
        }
        let number = number
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid_pr(input))?;
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

fn invalid_pr(input: &str) -> AppError {
    AppError::invalid_parameter(format!(
        "`{input}` is not a pull request identifier (expected owner/repo#number or a pull request URL)"
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    InlineReviewComment,
    GeneralComment,
    AiReviewItem,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub total_count: u32,
    #[serde(rename = "+1", default)]
    pub plus_one: u32,
    #[serde(rename = "-1", default)]
    pub minus_one: u32,
    #[serde(default)]
    pub laugh: u32,
    #[serde(default)]
    pub hooray: u32,
    #[serde(default)]
    pub confused: u32,
    #[serde(default)]
    pub heart: u32,
    #[serde(default)]
    pub rocket: u32,
    #[serde(default)]
    pub eyes: u32,
}

impl Reactions {
    pub fn has_any(&self) -> bool {
        self.total_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpActionArgs {
    pub thread_id: String,
}

/// Structured, machine-invokable instruction for resolving a review thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpAction {
    pub tool: String,
    pub args: McpActionArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCommands {
    pub reply_command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_command: Option<String>,
    pub resolve_condition: String,
    pub view_in_browser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_action: Option<McpAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Nit,
    Duplicate,
    Additional,
    Actionable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn for_suggestion(suggestion_type: SuggestionType) -> Self {
        match suggestion_type {
            SuggestionType::Nit => Severity::Low,
            SuggestionType::Actionable => Severity::High,
            SuggestionType::Duplicate | SuggestionType::Additional => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Security,
    Performance,
    Style,
    Bug,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSuggestion {
    pub old_code: String,
    pub new_code: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiReviewMetadata {
    pub suggestion_type: SuggestionType,
    pub severity: Severity,
    pub category: Category,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_suggestion: Option<CodeSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Unresolved,
    Acknowledged,
    InProgress,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Reply,
    Resolve,
    Investigate,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusIndicators {
    pub priority_score: u8,
    pub resolution_status: ResolutionStatus,
    pub suggested_action: SuggestedAction,
    pub needs_mcp_resolution: bool,
    pub has_manual_response: bool,
    pub is_actionable: bool,
    pub is_outdated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "type")]
    pub comment_type: CommentType,
    pub author: String,
    pub author_association: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_hunk: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outdated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Reactions>,
    pub html_url: String,
    pub action_commands: ActionCommands,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_review_metadata: Option<AiReviewMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_indicators: Option<StatusIndicators>,
}

impl Comment {
    pub fn suggestion_type(&self) -> Option<SuggestionType> {
        self.ai_review_metadata
            .as_ref()
            .map(|meta| meta.suggestion_type)
    }

    pub fn is_outdated(&self) -> bool {
        self.outdated.unwrap_or(false)
    }

    pub fn has_resolve_action(&self) -> bool {
        self.action_commands.mcp_action.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Chronological,
    File,
    Author,
    Priority,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnresolvedCommentsRequest {
    pub pr: String,
    #[serde(default = "default_true")]
    pub include_bots: bool,
    #[serde(default)]
    pub exclude_authors: Vec<String>,
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default = "default_true")]
    pub parse_review_bodies: bool,
    #[serde(default = "default_true")]
    pub include_nits: bool,
    #[serde(default)]
    pub include_duplicates: bool,
    #[serde(default = "default_true")]
    pub include_additional: bool,
    #[serde(default)]
    pub suggestion_types: Vec<SuggestionType>,
    #[serde(default)]
    pub prioritize_actionable: bool,
    #[serde(default)]
    pub group_by_type: bool,
}

impl UnresolvedCommentsRequest {
    pub fn new(pr: impl Into<String>) -> Self {
        Self {
            pr: pr.into(),
            include_bots: true,
            exclude_authors: Vec::new(),
            sort: SortMode::default(),
            cursor: None,
            page_size: None,
            parse_review_bodies: true,
            include_nits: true,
            include_duplicates: false,
            include_additional: true,
            suggestion_types: Vec::new(),
            prioritize_actionable: false,
            group_by_type: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ThreadResolution {
    Available,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrioritySummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub needs_mcp_resolution: usize,
    pub has_manual_response: usize,
    pub actionable: usize,
    pub outdated: usize,
}

/// Comment ids bucketed by resolution status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusGroups {
    pub unresolved: Vec<i64>,
    pub acknowledged: Vec<i64>,
    pub in_progress: Vec<i64>,
    pub resolved: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_author: BTreeMap<String, usize>,
    pub by_type: BTreeMap<CommentType, usize>,
    pub bot_comments: usize,
    pub human_comments: usize,
    pub with_reactions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PrioritySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_groups: Option<StatusGroups>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedCommentsResponse {
    pub pr: String,
    pub unresolved_in_page: usize,
    pub total_filtered: usize,
    pub comments: Vec<Comment>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub thread_resolution: ThreadResolution,
    pub summary: Summary,
}
