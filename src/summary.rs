use crate::models::{Comment, PrioritySummary, ResolutionStatus, StatusGroups, Summary};

pub const HIGH_PRIORITY_MIN: u8 = 70;
pub const MEDIUM_PRIORITY_MIN: u8 = 30;

/// Rollup over the full filtered set, not just the returned page.
pub fn build_summary(comments: &[Comment], scoring_enabled: bool) -> Summary {
    let mut summary = Summary {
        total: comments.len(),
        ..Summary::default()
    };

    for comment in comments {
        *summary.by_author.entry(comment.author.clone()).or_insert(0) += 1;
        *summary.by_type.entry(comment.comment_type).or_insert(0) += 1;
        if comment.is_bot {
            summary.bot_comments += 1;
        } else {
            summary.human_comments += 1;
        }
        if comment.reactions.as_ref().map(|r| r.has_any()).unwrap_or(false) {
            summary.with_reactions += 1;
        }
    }

    if scoring_enabled {
        let mut priority = PrioritySummary::default();
        let mut groups = StatusGroups::default();

        for comment in comments {
            let Some(status) = &comment.status_indicators else {
                continue;
            };
            match status.priority_score {
                s if s >= HIGH_PRIORITY_MIN => priority.high += 1,
                s if s >= MEDIUM_PRIORITY_MIN => priority.medium += 1,
                _ => priority.low += 1,
            }
            priority.needs_mcp_resolution += usize::from(status.needs_mcp_resolution);
            priority.has_manual_response += usize::from(status.has_manual_response);
            priority.actionable += usize::from(status.is_actionable);
            priority.outdated += usize::from(status.is_outdated);

            let bucket = match status.resolution_status {
                ResolutionStatus::Unresolved => &mut groups.unresolved,
                ResolutionStatus::Acknowledged => &mut groups.acknowledged,
                ResolutionStatus::InProgress => &mut groups.in_progress,
                ResolutionStatus::Resolved => &mut groups.resolved,
            };
            bucket.push(comment.id);
        }

        summary.priority = Some(priority);
        summary.status_groups = Some(groups);
    }

    summary
}
