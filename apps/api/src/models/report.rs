use serde::{Deserialize, Serialize};

/// Moderation outcome of a report filed against a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    /// Confirmed policy violation. Keeps the job disabled across a company unban.
    ResolvedValid,
    ResolvedInvalid,
}
