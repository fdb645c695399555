use std::cmp::Ordering;

use crate::models::{Comment, CommentType, SortMode, SuggestionType, UnresolvedCommentsRequest};
use crate::threads::ThreadCorrelation;

#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub include_bots: bool,
    pub exclude_authors: Vec<String>,
    pub include_nits: bool,
    pub include_duplicates: bool,
    pub include_additional: bool,
    pub suggestion_types: Vec<SuggestionType>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            include_bots: true,
            exclude_authors: Vec::new(),
            include_nits: true,
            include_duplicates: false,
            include_additional: true,
            suggestion_types: Vec::new(),
        }
    }
}

impl From<&UnresolvedCommentsRequest> for FilterOptions {
    fn from(request: &UnresolvedCommentsRequest) -> Self {
        Self {
            include_bots: request.include_bots,
            exclude_authors: request.exclude_authors.clone(),
            include_nits: request.include_nits,
            include_duplicates: request.include_duplicates,
            include_additional: request.include_additional,
            suggestion_types: request.suggestion_types.clone(),
        }
    }
}

impl FilterOptions {
    fn keeps(&self, comment: &Comment, correlation: &ThreadCorrelation) -> bool {
        let in_resolved_thread = comment.comment_type == CommentType::InlineReviewComment
            && correlation.in_resolved_thread(comment.id);
        let is_reply = comment.in_reply_to_id.is_some();
        let dropped_bot = comment.is_bot && !self.include_bots;
        let excluded_author = self
            .exclude_authors
            .iter()
            .any(|author| author.eq_ignore_ascii_case(&comment.author));

        !in_resolved_thread
            && !is_reply
            && !dropped_bot
            && !excluded_author
            && self.keeps_suggestion(comment)
    }

    fn keeps_suggestion(&self, comment: &Comment) -> bool {
        let Some(kind) = comment.suggestion_type() else {
            return true;
        };
        let toggled_on = match kind {
            SuggestionType::Nit => self.include_nits,
            SuggestionType::Duplicate => self.include_duplicates,
            SuggestionType::Additional => self.include_additional,
            SuggestionType::Actionable => true,
        };
        let allowed = self.suggestion_types.is_empty() || self.suggestion_types.contains(&kind);
        toggled_on && allowed
    }
}

/// Drops resolved-thread comments, replies, bots (unless included), excluded authors and
/// switched-off AI suggestion types.
pub fn apply_filters(
    comments: Vec<Comment>,
    correlation: &ThreadCorrelation,
    options: &FilterOptions,
) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|comment| options.keeps(comment, correlation))
        .collect()
}

/// Stable partition: actionable AI items first.
pub fn prioritize_actionable(comments: &mut [Comment]) {
    comments.sort_by_key(|c| c.suggestion_type() != Some(SuggestionType::Actionable));
}

fn type_rank(comment: &Comment) -> u8 {
    match comment.suggestion_type() {
        Some(SuggestionType::Actionable) => 0,
        Some(SuggestionType::Nit) => 1,
        Some(SuggestionType::Duplicate) => 2,
        Some(SuggestionType::Additional) => 3,
        None => 4,
    }
}

pub fn group_by_type(comments: &mut [Comment]) {
    comments.sort_by(|a, b| {
        type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| file_key(a).cmp(file_key(b)))
    });
}

fn file_key(comment: &Comment) -> &str {
    comment.file_path.as_deref().unwrap_or("")
}

fn score_of(comment: &Comment) -> u8 {
    comment
        .status_indicators
        .as_ref()
        .map(|s| s.priority_score)
        .unwrap_or(0)
}

fn by_priority(a: &Comment, b: &Comment) -> Ordering {
    score_of(b)
        .cmp(&score_of(a))
        .then_with(|| b.has_resolve_action().cmp(&a.has_resolve_action()))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn sort_comments(comments: &mut [Comment], mode: SortMode, scoring_enabled: bool) {
    match mode {
        SortMode::Chronological => comments.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortMode::File => comments.sort_by(|a, b| file_key(a).cmp(file_key(b))),
        SortMode::Author => comments.sort_by(|a, b| a.author.cmp(&b.author)),
        SortMode::Priority if scoring_enabled => comments.sort_by(by_priority),
        SortMode::Priority => comments.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
}
