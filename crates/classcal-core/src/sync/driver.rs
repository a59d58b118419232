//! One pass over a schedule: look each event up, create it when missing.

use crate::calendar::{CalendarService, RetryPolicy};
use crate::config::ResolvedConfig;
use crate::error::{CoreError, MalformedRowError, PlanError, RemoteError};
use crate::schedule::{Schedule, ScheduleRecord};

use super::plan::{PlannedEvent, PlannedRow, Planner};
use super::report::{OutcomeKind, RowOutcome, SyncReport};

/// Sequential sync of a schedule into one calendar.
///
/// Every row is planned before the first remote call, so a term that cannot
/// hold one of the sessions aborts the run untouched. After that rows are
/// independent: a failure is recorded in the report and the pass continues.
pub struct SyncDriver<'a, S: CalendarService + ?Sized> {
    service: &'a S,
    calendar_id: String,
    planner: Planner,
    retry: RetryPolicy,
}

impl<'a, S: CalendarService + ?Sized> SyncDriver<'a, S> {
    pub fn new(service: &'a S, calendar_id: impl Into<String>, planner: Planner) -> Self {
        Self {
            service,
            calendar_id: calendar_id.into(),
            planner,
            retry: RetryPolicy::default(),
        }
    }

    /// Driver for a resolved configuration.
    pub fn from_config(service: &'a S, config: &ResolvedConfig) -> Self {
        Self::new(
            service,
            config.calendar_id.clone(),
            Planner::new(config.term, config.timezone),
        )
        .with_retry(config.retry)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn plan_row(&self, record: &ScheduleRecord) -> Result<PlannedEvent, PlanError> {
        self.planner.plan_row(record)
    }

    /// Process every record in input order.
    ///
    /// Fails with [`CoreError::TermRange`] before any remote call when the
    /// term cannot hold one of the sessions.
    pub async fn run(&self, schedule: &Schedule) -> Result<SyncReport, CoreError> {
        let rows = self.planner.plan_schedule(schedule)?;

        let mut report = SyncReport::new();
        for row in &rows {
            let outcome = match row {
                PlannedRow::Ready(plan) => self.sync_planned(plan).await,
                PlannedRow::Malformed { error, label } => malformed(error, label.clone()),
            };
            report.record(outcome);
        }
        tracing::info!(calendar_id = %self.calendar_id, "sync finished: {}", report.summary);
        Ok(report)
    }

    async fn sync_planned(&self, plan: &PlannedEvent) -> RowOutcome {
        let outcome = |kind| RowOutcome {
            row: plan.row,
            identity: Some(plan.identity.clone()),
            label: Some(plan.session.title()),
            kind,
        };
        let calendar_id = self.calendar_id.as_str();

        let existing = self
            .retry
            .run("event lookup", || {
                self.service.find_event_by_identity(calendar_id, &plan.identity)
            })
            .await;
        match existing {
            Ok(Some(event)) => {
                tracing::info!(row = plan.row, identity = %plan.identity, "event already exists");
                return outcome(OutcomeKind::SkippedDuplicate { event_id: event.id });
            }
            Ok(None) => {}
            Err(err) => return outcome(self.remote_failure(plan, &err)),
        }

        let created = self
            .retry
            .run("event creation", || {
                self.service.create_event(calendar_id, &plan.payload)
            })
            .await;
        match created {
            Ok(event) => {
                tracing::info!(row = plan.row, identity = %plan.identity, "created event");
                outcome(OutcomeKind::Created { event_id: event.id })
            }
            // The id is taken, e.g. by a deleted event or a retried create that landed.
            Err(RemoteError::Conflict(_)) => {
                tracing::info!(row = plan.row, identity = %plan.identity, "event id already in use");
                outcome(OutcomeKind::SkippedDuplicate {
                    event_id: plan.identity.to_string(),
                })
            }
            Err(err) => outcome(self.remote_failure(plan, &err)),
        }
    }

    fn remote_failure(&self, plan: &PlannedEvent, err: &RemoteError) -> OutcomeKind {
        tracing::warn!(row = plan.row, identity = %plan.identity, error = %err, "remote call failed");
        OutcomeKind::FailedRemote {
            reason: err.to_string(),
        }
    }
}

fn malformed(err: &MalformedRowError, label: Option<String>) -> RowOutcome {
    tracing::warn!(row = err.row, field = %err.field, "skipping row: {}", err.message);
    RowOutcome {
        row: err.row,
        identity: None,
        label,
        kind: OutcomeKind::FailedMalformed {
            reason: format!("invalid {}: {}", err.field, err.message),
        },
    }
}
