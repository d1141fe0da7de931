//! Decision rule for job updates: which fields force a new embedding and which only
//! touch vector metadata.

use serde::Serialize;

use crate::models::job::{JobPostingPatch, JobPostingRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobChange {
    /// Title or description changed: the embedding is stale.
    Content,
    /// Only status or filter fields changed: patch metadata, keep the vector.
    MetadataOnly,
    Unchanged,
}

/// Compares the posting before and after `patch`.
///
/// Fields the patch repeats with their current value do not count as changes.
pub fn classify_job_update(current: &JobPostingRow, patch: &JobPostingPatch) -> JobChange {
    let next = patch.apply_to(current);

    if next.title != current.title || next.description != current.description {
        return JobChange::Content;
    }

    let metadata_changed = next.status != current.status
        || next.salary_min != current.salary_min
        || next.salary_max != current.salary_max
        || next.work_type != current.work_type
        || next.country != current.country
        || next.source_url != current.source_url;

    if metadata_changed {
        JobChange::MetadataOnly
    } else {
        JobChange::Unchanged
    }
}
