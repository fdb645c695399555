use std::collections::{HashMap, HashSet};

use crate::models::{
    Comment, ResolutionStatus, Severity, StatusIndicators, SuggestedAction, SuggestionType,
};

const ACTIONABLE_TERMS: [&str; 3] = ["fix", "suggest", "change"];

/// Ids of comments that received a reply from a different, human author.
pub fn manual_responses(comments: &[Comment]) -> HashSet<i64> {
    let authors: HashMap<i64, &str> = comments
        .iter()
        .map(|c| (c.id, c.author.as_str()))
        .collect();

    comments
        .iter()
        .filter(|reply| !reply.is_bot)
        .filter_map(|reply| {
            let parent = reply.in_reply_to_id?;
            if parent == reply.id {
                return None;
            }
            let parent_author = authors.get(&parent)?;
            (*parent_author != reply.author).then_some(parent)
        })
        .collect()
}

pub fn has_manual_response(comment: &Comment, comments: &[Comment]) -> bool {
    manual_responses(comments).contains(&comment.id)
}

pub fn is_actionable(comment: &Comment) -> bool {
    if comment.suggestion_type() == Some(SuggestionType::Actionable) {
        return true;
    }
    let body = comment.body.to_lowercase();
    ACTIONABLE_TERMS.iter().any(|term| body.contains(term))
}

pub fn priority_score(
    comment: &Comment,
    actionable: bool,
    manual_response: bool,
) -> u8 {
    let mut score: i32 = 0;

    if let Some(meta) = &comment.ai_review_metadata {
        score += match meta.severity {
            Severity::High => 40,
            Severity::Medium => 25,
            Severity::Low => 10,
        };
        score += match meta.suggestion_type {
            SuggestionType::Actionable => 30,
            SuggestionType::Additional => 20,
            SuggestionType::Nit => 5,
            SuggestionType::Duplicate => 0,
        };
    }
    if comment.is_bot && comment.has_resolve_action() {
        score += 20;
    }
    if actionable {
        score += 15;
    }
    if manual_response {
        score -= 10;
    }
    if comment.is_outdated() {
        score -= 20;
    }

    score.clamp(0, 100) as u8
}

pub fn status_indicators(comment: &Comment, manual_response: bool) -> StatusIndicators {
    let actionable = is_actionable(comment);
    let outdated = comment.is_outdated();
    let resolve_action = comment.has_resolve_action();
    let score = priority_score(comment, actionable, manual_response);

    let resolution_status = if outdated {
        ResolutionStatus::Resolved
    } else if resolve_action {
        ResolutionStatus::InProgress
    } else if manual_response {
        if actionable {
            ResolutionStatus::InProgress
        } else {
            ResolutionStatus::Acknowledged
        }
    } else {
        ResolutionStatus::Unresolved
    };

    let suggested_action = if resolve_action && !manual_response {
        SuggestedAction::Resolve
    } else if actionable && !manual_response {
        SuggestedAction::Reply
    } else if score < 30 {
        SuggestedAction::Ignore
    } else {
        SuggestedAction::Investigate
    };

    StatusIndicators {
        priority_score: score,
        resolution_status,
        suggested_action,
        needs_mcp_resolution: resolve_action,
        has_manual_response: manual_response,
        is_actionable: actionable,
        is_outdated: outdated,
    }
}

/// Attaches status indicators to every comment; reply detection sees the whole set.
pub fn score_comments(comments: &mut [Comment]) {
    let responded = manual_responses(comments);
    for comment in comments.iter_mut() {
        let manual = responded.contains(&comment.id);
        comment.status_indicators = Some(status_indicators(comment, manual));
    }
}
