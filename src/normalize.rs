use crate::github::{GitHubIssueComment, GitHubReviewComment, GitHubUser};
use crate::models::{ActionCommands, Comment, CommentType, McpAction, McpActionArgs, PullRequestRef};
use crate::threads::ThreadCorrelation;

pub const RESOLVE_CONDITION: &str = "Resolve only after the requested change is committed and pushed, \
or after the reviewer has agreed that no change is needed. Never resolve automatically.";
const RESOLVE_TAG: &str = "[ONLY AFTER: fix pushed or reviewer agreed no change is needed]";
const RESOLVE_TOOL: &str = "resolve_review_thread";
const UNKNOWN_AUTHOR: &str = "ghost";
const DEFAULT_ASSOCIATION: &str = "NONE";

pub(crate) fn author_fields(user: Option<&GitHubUser>) -> (String, bool) {
    match user {
        Some(user) => (user.login.clone(), user.is_bot()),
        None => (UNKNOWN_AUTHOR.to_string(), false),
    }
}

pub(crate) fn association(raw: Option<&str>) -> String {
    raw.filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_ASSOCIATION)
        .to_string()
}

pub fn normalize_review_comment(
    raw: &GitHubReviewComment,
    pr: &PullRequestRef,
    correlation: &ThreadCorrelation,
) -> Comment {
    let (author, is_bot) = author_fields(raw.user.as_ref());
    let id = raw.id as i64;
    let thread_id = correlation.open_thread_for(id);

    Comment {
        id,
        comment_type: CommentType::InlineReviewComment,
        author,
        author_association: association(raw.author_association.as_deref()),
        is_bot,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        file_path: Some(raw.path.clone()),
        line_number: raw.line.or(raw.original_line),
        start_line: raw.start_line.or(raw.original_start_line),
        diff_hunk: raw.diff_hunk.clone(),
        body: raw.body.clone().unwrap_or_default(),
        in_reply_to_id: raw.in_reply_to_id.map(|v| v as i64),
        // GitHub drops the diff position once the anchored line no longer exists.
        outdated: Some(raw.position.is_none()),
        reactions: raw.reactions.clone(),
        html_url: raw.html_url.clone(),
        action_commands: build_action_commands(
            pr,
            CommentType::InlineReviewComment,
            id,
            &raw.html_url,
            thread_id,
        ),
        ai_review_metadata: None,
        status_indicators: None,
    }
}

pub fn normalize_issue_comment(raw: &GitHubIssueComment, pr: &PullRequestRef) -> Comment {
    let (author, is_bot) = author_fields(raw.user.as_ref());
    let id = raw.id as i64;

    Comment {
        id,
        comment_type: CommentType::GeneralComment,
        author,
        author_association: association(raw.author_association.as_deref()),
        is_bot,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        file_path: None,
        line_number: None,
        start_line: None,
        diff_hunk: None,
        body: raw.body.clone().unwrap_or_default(),
        in_reply_to_id: None,
        outdated: None,
        reactions: raw.reactions.clone(),
        html_url: raw.html_url.clone(),
        action_commands: build_action_commands(
            pr,
            CommentType::GeneralComment,
            id,
            &raw.html_url,
            None,
        ),
        ai_review_metadata: None,
        status_indicators: None,
    }
}

/// Builds the reply/resolve instructions handed to the caller. Nothing here is executed.
pub fn build_action_commands(
    pr: &PullRequestRef,
    comment_type: CommentType,
    comment_id: i64,
    html_url: &str,
    thread_id: Option<&str>,
) -> ActionCommands {
    let reply_command = match comment_type {
        CommentType::InlineReviewComment => format!(
            "gh api repos/{}/{}/pulls/{}/comments/{comment_id}/replies -f body=\"<your reply>\"",
            pr.owner, pr.repo, pr.number
        ),
        CommentType::GeneralComment | CommentType::AiReviewItem => format!(
            "gh pr comment {} --repo {}/{} --body \"<your reply>\"",
            pr.number, pr.owner, pr.repo
        ),
    };

    let resolve_command = match (comment_type, thread_id) {
        (CommentType::InlineReviewComment, Some(thread)) => Some(format!(
            "{RESOLVE_TAG} gh api graphql -f query='mutation {{ resolveReviewThread(input: {{threadId: \"{thread}\"}}) {{ thread {{ isResolved }} }} }}'"
        )),
        (CommentType::InlineReviewComment, None) => Some(format!(
            "{RESOLVE_TAG} open {html_url} and use \"Resolve conversation\" on the thread"
        )),
        _ => None,
    };

    let mcp_action = match (comment_type, thread_id) {
        (CommentType::InlineReviewComment, Some(thread)) => Some(McpAction {
            tool: RESOLVE_TOOL.to_string(),
            args: McpActionArgs {
                thread_id: thread.to_string(),
            },
        }),
        _ => None,
    };

    ActionCommands {
        reply_command,
        resolve_command,
        resolve_condition: RESOLVE_CONDITION.to_string(),
        view_in_browser: html_url.to_string(),
        mcp_action,
    }
}
