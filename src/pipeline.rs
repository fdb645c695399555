use tracing::info;

use crate::ai_review::{review_to_comments, SyntheticIds};
use crate::config::Config;
use crate::cursor::{decode_cursor, encode_cursor, Cursor};
use crate::error::AppResult;
use crate::fetcher::{fetch_sources, SourceData};
use crate::filter::{apply_filters, group_by_type, prioritize_actionable, sort_comments, FilterOptions};
use crate::github::PullRequestSource;
use crate::models::{
    Comment, PullRequestRef, UnresolvedCommentsRequest, UnresolvedCommentsResponse,
};
use crate::normalize::{normalize_issue_comment, normalize_review_comment};
use crate::scoring::score_comments;
use crate::summary::build_summary;

/// Offset and clamped page size for this request. Cursor errors surface here, before any
/// network call.
pub fn resolve_page(request: &UnresolvedCommentsRequest, config: &Config) -> AppResult<Cursor> {
    let server_max = config.page_size.max(1);
    let (offset, requested) = match request.cursor.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(token) => {
            let cursor = decode_cursor(token)?;
            (cursor.offset, cursor.page_size)
        }
        None => (0, request.page_size.unwrap_or(server_max)),
    };
    Ok(Cursor {
        offset,
        page_size: requested.clamp(1, server_max),
    })
}

/// Normalizes every source record into one comment list, synthesizing AI-review items.
pub fn collect_comments(
    sources: &SourceData,
    pr: &PullRequestRef,
    ids: &mut SyntheticIds,
) -> Vec<Comment> {
    let mut comments: Vec<Comment> = sources
        .review_comments
        .iter()
        .map(|raw| normalize_review_comment(raw, pr, &sources.correlation))
        .collect();
    comments.extend(
        sources
            .issue_comments
            .iter()
            .map(|raw| normalize_issue_comment(raw, pr)),
    );
    for review in &sources.reviews {
        comments.extend(review_to_comments(review, pr, ids));
    }
    comments
}

/// Builds one page of unresolved feedback for the requested pull request.
///
/// Ordering is layered: the requested `sort` runs first, then `group_by_type`, then
/// `prioritize_actionable`. Both reorderings are stable, so each keeps the order produced
/// by the layer beneath it within its groups.
pub async fn get_unresolved_comments<S: PullRequestSource>(
    source: &S,
    config: &Config,
    request: &UnresolvedCommentsRequest,
) -> AppResult<UnresolvedCommentsResponse> {
    let pr = PullRequestRef::parse(&request.pr)?;
    let page = resolve_page(request, config)?;

    let include_reviews = config.parse_ai_reviews && request.parse_review_bodies;
    let sources = fetch_sources(source, &pr, include_reviews).await?;

    let mut ids = SyntheticIds::new();
    let mut comments = collect_comments(&sources, &pr, &mut ids);
    let collected = comments.len();
    if config.priority_scoring {
        score_comments(&mut comments);
    }

    let mut filtered = apply_filters(comments, &sources.correlation, &FilterOptions::from(request));
    sort_comments(&mut filtered, request.sort, config.priority_scoring);
    if request.group_by_type {
        group_by_type(&mut filtered);
    }
    if request.prioritize_actionable {
        prioritize_actionable(&mut filtered);
    }

    let summary = build_summary(&filtered, config.priority_scoring);
    let total = filtered.len();
    let page_size = page.page_size as usize;
    let start = page.offset.min(total);
    let end = page.offset.saturating_add(page_size).min(total);
    let next_cursor = (end < total).then(|| {
        encode_cursor(&Cursor {
            offset: page.offset + page_size,
            page_size: page.page_size,
        })
    });
    let page_comments: Vec<Comment> = filtered.drain(start..end).collect();

    info!(
        pr = %pr,
        collected,
        filtered = total,
        offset = page.offset,
        returned = page_comments.len(),
        has_more = next_cursor.is_some(),
        "built unresolved comment page"
    );

    Ok(UnresolvedCommentsResponse {
        pr: pr.to_string(),
        unresolved_in_page: page_comments.len(),
        total_filtered: total,
        comments: page_comments,
        next_cursor,
        thread_resolution: sources.correlation.resolution(),
        summary,
    })
}
