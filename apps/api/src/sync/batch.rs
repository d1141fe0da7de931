//! Batch runner for cascades. Every dependent document is handled independently:
//! a failure is logged and recorded, and the remaining documents still run.

use std::future::Future;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CascadeLimits;
use crate::sync::metadata::SyncOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// "N of M completed" summary of one cascade batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Documents with no vector entry.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedItem>,
    /// Documents still in flight or never started when the deadline elapsed.
    pub not_completed: usize,
    pub timed_out: bool,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.updated + self.unchanged + self.skipped.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }
}

/// Runs `op` over `ids` with at most `limits.concurrency` in flight, stopping at
/// `limits.deadline`. Never fails: per-item errors end up in the report.
pub async fn run_batch<F, Fut, E>(
    label: &str,
    ids: Vec<String>,
    limits: CascadeLimits,
    op: F,
) -> BatchReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<SyncOutcome, E>>,
    E: std::fmt::Display,
{
    let mut report = BatchReport {
        total: ids.len(),
        ..Default::default()
    };
    if ids.is_empty() {
        return report;
    }

    let deadline = Instant::now() + limits.deadline;
    let mut results = stream::iter(ids.into_iter().map(|id| {
        let fut = op(id.clone());
        async move { (id, fut.await) }
    }))
    .buffer_unordered(limits.concurrency.max(1));

    loop {
        match tokio::time::timeout_at(deadline, results.next()).await {
            Ok(Some((_, Ok(SyncOutcome::Updated)))) => report.updated += 1,
            Ok(Some((_, Ok(SyncOutcome::Unchanged)))) => report.unchanged += 1,
            Ok(Some((id, Ok(SyncOutcome::NotFound)))) => report.skipped.push(id),
            Ok(Some((id, Err(e)))) => {
                warn!("{label}: document {id} failed: {e}");
                report.failed.push(FailedItem {
                    id,
                    error: e.to_string(),
                });
            }
            Ok(None) => break,
            Err(_) => {
                report.timed_out = true;
                report.not_completed =
                    report.total - report.completed() - report.failed.len();
                warn!(
                    "{label}: deadline of {:?} elapsed with {} of {} documents unfinished",
                    limits.deadline, report.not_completed, report.total
                );
                break;
            }
        }
    }

    if report.is_complete() {
        debug!(
            "{label}: all {} documents completed ({} updated, {} unchanged, {} skipped)",
            report.total,
            report.updated,
            report.unchanged,
            report.skipped.len()
        );
    } else {
        warn!(
            "{label}: {} of {} completed ({} failed, {} unfinished)",
            report.completed(),
            report.total,
            report.failed.len(),
            report.not_completed
        );
    }
    report
}
