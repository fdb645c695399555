// Category 13: Orchestrator Tests (pipeline.rs)

use crate::cursor::{decode_cursor, encode_cursor, Cursor};
use crate::error::{AppError, ErrorCategory};
use crate::models::{CommentType, SortMode, ThreadResolution, UnresolvedCommentsRequest};
use crate::pipeline::{get_unresolved_comments, resolve_page};
use crate::tests::fixtures::{
    config, issue_comment, page, reply_comment, review, review_comment, thread, FakeSource,
};

const AI_REVIEW: &str = "<summary>🧹 Nitpick comments (1)</summary>\n<summary>src/lib.rs (1)</summary>\n`3`: **Prefer a match here**\nIt reads better.\n";

fn many_issue_comments(count: u64) -> FakeSource {
    FakeSource {
        issue_comments: (1..=count)
            .map(|id| issue_comment(id, "bob", "User", (id % 60) as u32))
            .collect(),
        ..FakeSource::default()
    }
}

/// Test Case 13.1: All sources merge into one filtered, correlated page
#[tokio::test]
async fn test_end_to_end() {
    let source = FakeSource {
        review_comments: vec![
            review_comment(11, "alice", 1),
            reply_comment(12, "bob", 11, 2),
            review_comment(13, "carol", 3),
        ],
        issue_comments: vec![issue_comment(21, "dave", "User", 4)],
        reviews: vec![review(31, "coderabbitai[bot]", AI_REVIEW)],
        thread_pages: vec![(
            None,
            page(
                vec![
                    thread("PRRT_open", false, &[11, 12]),
                    thread("PRRT_done", true, &[13]),
                ],
                None,
            ),
        )],
        ..FakeSource::default()
    };

    let request = UnresolvedCommentsRequest::new("acme/widgets#42");
    let response = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();

    assert_eq!(response.pr, "acme/widgets#42");
    assert_eq!(response.thread_resolution, ThreadResolution::Available);
    let ids: Vec<i64> = response.comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![11, 21, -1], "replies and resolved threads are dropped");
    assert_eq!(response.total_filtered, 3);
    assert_eq!(response.unresolved_in_page, 3);
    assert!(response.next_cursor.is_none());

    let inline = &response.comments[0];
    assert_eq!(
        inline.action_commands.mcp_action.as_ref().map(|a| a.args.thread_id.as_str()),
        Some("PRRT_open")
    );
    let status = inline.status_indicators.as_ref().unwrap();
    assert!(status.has_manual_response, "bob replied to alice");

    assert_eq!(response.comments[2].comment_type, CommentType::AiReviewItem);
}

/// Test Case 13.2: Scenario - oversized page size clamps to the server maximum
#[tokio::test]
async fn test_page_size_clamped() {
    let source = many_issue_comments(25);
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.page_size = Some(500);

    let first = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert_eq!(first.comments.len(), 20);
    assert_eq!(first.total_filtered, 25);
    let token = first.next_cursor.clone().expect("more pages");
    assert_eq!(
        decode_cursor(&token).unwrap(),
        Cursor {
            offset: 20,
            page_size: 20
        }
    );

    request.cursor = Some(token);
    let second = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert_eq!(second.comments.len(), 5);
    assert!(second.next_cursor.is_none());
    assert_eq!(second.summary.total, 25);
}

/// Test Case 13.3: Next cursor exists exactly when more comments remain
#[tokio::test]
async fn test_next_cursor_boundary() {
    let source = many_issue_comments(20);
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.page_size = Some(10);

    let first = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert!(first.next_cursor.is_some());

    request.cursor = first.next_cursor;
    let last = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert_eq!(last.comments.len(), 10);
    assert!(last.next_cursor.is_none(), "offset + pageSize == total");
}

/// Test Case 13.4: An offset past the end yields an empty page
#[tokio::test]
async fn test_offset_past_end() {
    let source = many_issue_comments(3);
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.cursor = Some(encode_cursor(&Cursor {
        offset: 50,
        page_size: 10,
    }));

    let response = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert!(response.comments.is_empty());
    assert_eq!(response.total_filtered, 3);
    assert!(response.next_cursor.is_none());
}

/// Test Case 13.5: Scenario - a malformed cursor fails before any fetch
#[tokio::test]
async fn test_bad_cursor_fails_early() {
    let source = many_issue_comments(3);
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.cursor = Some("%%% not a cursor %%%".to_string());

    let err = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidParameter(_)));
    assert_eq!(err.category(), ErrorCategory::UserError);
    assert_eq!(source.source_calls(), 0);
    assert_eq!(source.thread_calls(), 0);
}

/// Test Case 13.6: An unparseable PR identifier fails before any fetch
#[tokio::test]
async fn test_bad_pr_fails_early() {
    let source = FakeSource::default();
    let request = UnresolvedCommentsRequest::new("not a pull request");

    let err = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidParameter(_)));
    assert_eq!(source.source_calls(), 0);
}

/// Test Case 13.7: A failed thread query still returns comments
#[tokio::test]
async fn test_thread_failure_degrades() {
    let source = FakeSource {
        review_comments: vec![review_comment(11, "alice", 1)],
        fail_threads: true,
        ..FakeSource::default()
    };

    let response = get_unresolved_comments(
        &source,
        &config(),
        &UnresolvedCommentsRequest::new("acme/widgets#42"),
    )
    .await
    .unwrap();
    assert_eq!(response.comments.len(), 1);
    assert!(response.comments[0].action_commands.mcp_action.is_none());
    assert!(matches!(
        response.thread_resolution,
        ThreadResolution::Unavailable { .. }
    ));
}

/// Test Case 13.8: A failed source fails the whole request
#[tokio::test]
async fn test_source_failure_fails_request() {
    let source = FakeSource {
        fail_issue_comments: true,
        ..FakeSource::default()
    };

    let err = get_unresolved_comments(
        &source,
        &config(),
        &UnresolvedCommentsRequest::new("acme/widgets#42"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UserError);
}

/// Test Case 13.9: Scoring off omits status indicators and priority rollups
#[tokio::test]
async fn test_scoring_disabled() {
    let source = many_issue_comments(2);
    let mut config = config();
    config.priority_scoring = false;
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.sort = SortMode::Priority;

    let response = get_unresolved_comments(&source, &config, &request)
        .await
        .unwrap();
    assert!(response.comments.iter().all(|c| c.status_indicators.is_none()));
    assert!(response.summary.priority.is_none());
    assert!(response.summary.status_groups.is_none());
}

/// Test Case 13.10: Review bodies are not fetched when parsing is off
#[tokio::test]
async fn test_review_parsing_disabled() {
    let source = FakeSource {
        reviews: vec![review(31, "coderabbitai[bot]", AI_REVIEW)],
        ..FakeSource::default()
    };
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.parse_review_bodies = false;

    let response = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    assert!(response.comments.is_empty());
    assert_eq!(source.review_calls(), 0);
}

/// Test Case 13.11: Bots excluded on request
#[tokio::test]
async fn test_exclude_bots() {
    let source = FakeSource {
        issue_comments: vec![
            issue_comment(1, "bob", "User", 1),
            issue_comment(2, "dependabot[bot]", "Bot", 2),
        ],
        reviews: vec![review(31, "coderabbitai[bot]", AI_REVIEW)],
        ..FakeSource::default()
    };
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.include_bots = false;

    let response = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    let ids: Vec<i64> = response.comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(response.summary.bot_comments, 0);
}

/// Test Case 13.12: Page resolution prefers the cursor's page size
#[test]
fn test_resolve_page() {
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    assert_eq!(
        resolve_page(&request, &config()).unwrap(),
        Cursor {
            offset: 0,
            page_size: 20
        }
    );

    request.page_size = Some(0);
    assert_eq!(resolve_page(&request, &config()).unwrap().page_size, 1);

    request.page_size = Some(5);
    request.cursor = Some(encode_cursor(&Cursor {
        offset: 15,
        page_size: 15,
    }));
    assert_eq!(
        resolve_page(&request, &config()).unwrap(),
        Cursor {
            offset: 15,
            page_size: 15
        }
    );
}

/// Test Case 13.13: Requested sort runs first, type grouping and actionable-first layer on top
#[tokio::test]
async fn test_ordering_layers() {
    let body = "<summary>🧹 Nitpick comments (1)</summary>\n<summary>src/z.rs (1)</summary>\n`3`: **Tidy import**\nMinor.\n</blockquote>\n<summary>Actionable comments (1)</summary>\n<summary>src/y.rs (1)</summary>\n`8`: **Handle the error**\nThis can crash.\n";
    let source = FakeSource {
        issue_comments: vec![
            issue_comment(1, "zoe", "User", 1),
            issue_comment(2, "amy", "User", 2),
        ],
        reviews: vec![review(31, "coderabbitai[bot]", body)],
        ..FakeSource::default()
    };
    let mut request = UnresolvedCommentsRequest::new("acme/widgets#42");
    request.sort = SortMode::Author;

    let sorted_only = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    let ids: Vec<i64> = sorted_only.comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, -1, -2, 1]);

    request.prioritize_actionable = true;
    let layered = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    let ids: Vec<i64> = layered.comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![-2, 2, -1, 1], "author order kept behind the actionable item");

    request.group_by_type = true;
    let grouped = get_unresolved_comments(&source, &config(), &request)
        .await
        .unwrap();
    let ids: Vec<i64> = grouped.comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![-2, -1, 2, 1]);
}
