//! Per-row outcomes and the run summary.

use std::fmt;

use serde::Serialize;

use crate::identity::EventIdentity;

/// What happened to one schedule row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeKind {
    Created { event_id: String },
    SkippedDuplicate { event_id: String },
    FailedMalformed { reason: String },
    FailedRemote { reason: String },
}

impl OutcomeKind {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeKind::FailedMalformed { .. } | OutcomeKind::FailedRemote { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    /// 1-based data row number.
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<EventIdentity>,
    /// Event title, or the raw course label when the row did not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.row)?;
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        match &self.kind {
            OutcomeKind::Created { event_id } => write!(f, ": created {event_id}"),
            OutcomeKind::SkippedDuplicate { event_id } => {
                write!(f, ": already exists ({event_id})")
            }
            OutcomeKind::FailedMalformed { reason } => write!(f, ": skipped, {reason}"),
            OutcomeKind::FailedRemote { reason } => write!(f, ": failed, {reason}"),
        }
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub skipped_duplicate: usize,
    pub failed_malformed: usize,
    pub failed_remote: usize,
}

impl SyncSummary {
    pub fn failed(&self) -> usize {
        self.failed_malformed + self.failed_remote
    }

    pub fn total(&self) -> usize {
        self.created + self.skipped_duplicate + self.failed()
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} already existed, {} malformed, {} failed",
            self.created, self.skipped_duplicate, self.failed_malformed, self.failed_remote
        )
    }
}

/// Every row's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub rows: Vec<RowOutcome>,
    pub summary: SyncSummary,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome.kind {
            OutcomeKind::Created { .. } => self.summary.created += 1,
            OutcomeKind::SkippedDuplicate { .. } => self.summary.skipped_duplicate += 1,
            OutcomeKind::FailedMalformed { .. } => self.summary.failed_malformed += 1,
            OutcomeKind::FailedRemote { .. } => self.summary.failed_remote += 1,
        }
        self.rows.push(outcome);
    }

    /// True when any row failed; the run should then exit non-zero.
    pub fn has_failures(&self) -> bool {
        self.summary.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows.iter().filter(|r| r.kind.is_failure())
    }
}
