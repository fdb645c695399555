use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::github::PullRequestSource;
use crate::models::{PullRequestRef, ThreadResolution};

const MAX_THREAD_PAGES: usize = 50;

/// Which review thread each inline comment belongs to, and which threads are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadCorrelation {
    Correlated {
        comment_threads: HashMap<u64, String>,
        resolved_threads: HashSet<String>,
    },
    Unavailable {
        reason: String,
    },
}

impl ThreadCorrelation {
    pub fn empty() -> Self {
        ThreadCorrelation::Correlated {
            comment_threads: HashMap::new(),
            resolved_threads: HashSet::new(),
        }
    }

    pub fn thread_for(&self, comment_id: i64) -> Option<&str> {
        let ThreadCorrelation::Correlated {
            comment_threads, ..
        } = self
        else {
            return None;
        };
        let id = u64::try_from(comment_id).ok()?;
        comment_threads.get(&id).map(String::as_str)
    }

    pub fn is_thread_resolved(&self, thread_id: &str) -> bool {
        match self {
            ThreadCorrelation::Correlated {
                resolved_threads, ..
            } => resolved_threads.contains(thread_id),
            ThreadCorrelation::Unavailable { .. } => false,
        }
    }

    pub fn in_resolved_thread(&self, comment_id: i64) -> bool {
        self.thread_for(comment_id)
            .map(|thread| self.is_thread_resolved(thread))
            .unwrap_or(false)
    }

    /// Thread id usable for a structured resolve action: known and not yet resolved.
    pub fn open_thread_for(&self, comment_id: i64) -> Option<&str> {
        self.thread_for(comment_id)
            .filter(|thread| !self.is_thread_resolved(thread))
    }

    pub fn resolution(&self) -> ThreadResolution {
        match self {
            ThreadCorrelation::Correlated { .. } => ThreadResolution::Available,
            ThreadCorrelation::Unavailable { reason } => ThreadResolution::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

/// Maps the given inline comment ids to their review threads. A failed query degrades to
/// `Unavailable` instead of failing the request.
pub async fn correlate_threads<S: PullRequestSource>(
    source: &S,
    pr: &PullRequestRef,
    comment_ids: &[u64],
) -> ThreadCorrelation {
    if comment_ids.is_empty() {
        return ThreadCorrelation::empty();
    }

    match collect_threads(source, pr, comment_ids).await {
        Ok(correlation) => correlation,
        Err(err) => {
            warn!(
                owner = %pr.owner,
                repo = %pr.repo,
                number = pr.number,
                error = %err,
                "review thread lookup failed; continuing without resolution data"
            );
            ThreadCorrelation::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

async fn collect_threads<S: PullRequestSource>(
    source: &S,
    pr: &PullRequestRef,
    comment_ids: &[u64],
) -> AppResult<ThreadCorrelation> {
    let mut still_needed: HashSet<u64> = comment_ids.iter().copied().collect();
    let mut comment_threads = HashMap::new();
    let mut resolved_threads = HashSet::new();
    let mut after: Option<String> = None;

    for page_number in 1..=MAX_THREAD_PAGES {
        let page = source.review_threads_page(pr, after.as_deref()).await?;
        debug!(
            page = page_number,
            threads = page.threads.len(),
            remaining = still_needed.len(),
            "fetched review thread page"
        );

        for thread in page.threads {
            if thread.is_resolved {
                resolved_threads.insert(thread.id.clone());
            }
            for comment_id in thread.comment_ids {
                if still_needed.remove(&comment_id) {
                    comment_threads.insert(comment_id, thread.id.clone());
                }
            }
        }

        if still_needed.is_empty() || !page.has_next_page {
            break;
        }
        match page.end_cursor {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    Ok(ThreadCorrelation::Correlated {
        comment_threads,
        resolved_threads,
    })
}
