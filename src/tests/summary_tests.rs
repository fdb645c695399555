// Category 12: Summary Builder Tests (summary.rs)

use crate::models::{CommentType, Reactions};
use crate::scoring::score_comments;
use crate::summary::build_summary;
use crate::tests::fixtures::{comment, inline_with_thread};

/// Test Case 12.1: Scenario - ten comments, three from bots
#[test]
fn test_bot_human_split() {
    let comments: Vec<_> = (1..=10)
        .map(|id| {
            let mut c = comment(id, if id <= 3 { "ci[bot]" } else { "bob" }, id as u32);
            c.is_bot = id <= 3;
            c
        })
        .collect();

    let summary = build_summary(&comments, false);
    assert_eq!(summary.total, 10);
    assert_eq!(summary.bot_comments, 3);
    assert_eq!(summary.human_comments, 7);
    assert_eq!(summary.by_author.get("ci[bot]"), Some(&3));
    assert_eq!(summary.by_author.get("bob"), Some(&7));
}

/// Test Case 12.2: Counts by type and reactions
#[test]
fn test_type_and_reaction_counts() {
    let mut reacted = comment(1, "bob", 1);
    reacted.reactions = Some(Reactions {
        total_count: 2,
        plus_one: 2,
        ..Reactions::default()
    });
    let mut empty_reactions = comment(2, "bob", 2);
    empty_reactions.reactions = Some(Reactions::default());
    let inline = inline_with_thread(3, "alice", 3, "PRRT_1");

    let summary = build_summary(&[reacted, empty_reactions, inline], false);
    assert_eq!(summary.by_type.get(&CommentType::GeneralComment), Some(&2));
    assert_eq!(summary.by_type.get(&CommentType::InlineReviewComment), Some(&1));
    assert_eq!(summary.with_reactions, 1);
}

/// Test Case 12.3: Priority tiers and status groups appear only with scoring
#[test]
fn test_priority_rollup() {
    let mut comments = vec![
        inline_with_thread(1, "alice", 1, "PRRT_1"),
        comment(2, "bob", 2),
        {
            let mut outdated = inline_with_thread(3, "carol", 3, "PRRT_3");
            outdated.outdated = Some(true);
            outdated
        },
    ];
    score_comments(&mut comments);

    let plain = build_summary(&comments, false);
    assert!(plain.priority.is_none());
    assert!(plain.status_groups.is_none());

    let summary = build_summary(&comments, true);
    let priority = summary.priority.unwrap();
    assert_eq!(priority.high + priority.medium + priority.low, 3);
    assert_eq!(priority.needs_mcp_resolution, 2);
    assert_eq!(priority.outdated, 1);

    let groups = summary.status_groups.unwrap();
    assert_eq!(groups.in_progress, vec![1]);
    assert_eq!(groups.unresolved, vec![2]);
    assert_eq!(groups.resolved, vec![3]);
    assert!(groups.acknowledged.is_empty());
}

/// Test Case 12.4: Empty input
#[test]
fn test_empty_summary() {
    let summary = build_summary(&[], true);
    assert_eq!(summary.total, 0);
    assert!(summary.by_author.is_empty());
    assert_eq!(summary.priority.unwrap_or_default().high, 0);
}
