use tracing::info;

use crate::error::AppResult;
use crate::github::{GitHubIssueComment, GitHubReview, GitHubReviewComment, PullRequestSource};
use crate::models::PullRequestRef;
use crate::threads::{correlate_threads, ThreadCorrelation};

/// Raw records for one pull request plus the thread correlation of its inline comments.
#[derive(Debug)]
pub struct SourceData {
    pub review_comments: Vec<GitHubReviewComment>,
    pub issue_comments: Vec<GitHubIssueComment>,
    pub reviews: Vec<GitHubReview>,
    pub correlation: ThreadCorrelation,
}

/// Fetches the three comment sources concurrently, then correlates inline comments with
/// their review threads. Source failures propagate; correlation failures degrade.
pub async fn fetch_sources<S: PullRequestSource>(
    source: &S,
    pr: &PullRequestRef,
    include_reviews: bool,
) -> AppResult<SourceData> {
    let reviews = async {
        if include_reviews {
            source.list_reviews(pr).await
        } else {
            Ok(Vec::new())
        }
    };

    let (review_comments, issue_comments, reviews) = tokio::try_join!(
        source.list_review_comments(pr),
        source.list_issue_comments(pr),
        reviews
    )?;

    let inline_ids: Vec<u64> = review_comments.iter().map(|c| c.id).collect();
    let correlation = correlate_threads(source, pr, &inline_ids).await;

    info!(
        owner = %pr.owner,
        repo = %pr.repo,
        number = pr.number,
        review_comments = review_comments.len(),
        issue_comments = issue_comments.len(),
        reviews = reviews.len(),
        threads_available = matches!(correlation, ThreadCorrelation::Correlated { .. }),
        "fetched pull request comment sources"
    );

    Ok(SourceData {
        review_comments,
        issue_comments,
        reviews,
        correlation,
    })
}
