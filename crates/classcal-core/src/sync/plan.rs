//! Turning schedule records into concrete events, without touching the network.

use chrono_tz::Tz;
use serde::Serialize;

use crate::calendar::EventPayload;
use crate::error::{InvalidTermRangeError, MalformedRowError, PlanError};
use crate::identity::EventIdentity;
use crate::recurrence::{build_recurrence, RecurrenceSpec, TermRange};
use crate::schedule::{Schedule, ScheduleRecord, SessionDefinition};

/// Everything needed to create one recurring event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEvent {
    pub row: usize,
    pub identity: EventIdentity,
    pub session: SessionDefinition,
    pub recurrence: RecurrenceSpec,
    pub payload: EventPayload,
}

/// Result of planning one record of a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedRow {
    Ready(PlannedEvent),
    /// The record is unusable; `label` is its course code when one was read.
    Malformed {
        error: MalformedRowError,
        label: Option<String>,
    },
}

/// Term and timezone shared by every row of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Planner {
    term: TermRange,
    timezone: Tz,
}

impl Planner {
    pub fn new(term: TermRange, timezone: Tz) -> Self {
        Self { term, timezone }
    }

    /// Parse, schedule and identify one record.
    pub fn plan_row(&self, record: &ScheduleRecord) -> Result<PlannedEvent, PlanError> {
        let session = record.row.parse(record.index)?;
        let recurrence = build_recurrence(&session, &self.term, self.timezone)?;
        let identity = EventIdentity::for_session(&session);
        let payload = EventPayload::build(&session, &recurrence, &identity)?;

        Ok(PlannedEvent {
            row: record.index,
            identity,
            session,
            recurrence,
            payload,
        })
    }

    /// Plan every record in input order.
    ///
    /// Malformed records are kept in place. The first term range error ends
    /// planning: a session the term cannot hold makes the whole run invalid.
    pub fn plan_schedule(&self, schedule: &Schedule) -> Result<Vec<PlannedRow>, InvalidTermRangeError> {
        let mut rows = Vec::with_capacity(schedule.len());
        for record in &schedule.records {
            let planned = match record {
                Ok(record) => match self.plan_row(record) {
                    Ok(plan) => PlannedRow::Ready(plan),
                    Err(PlanError::Malformed(error)) => {
                        let course = record.row.course.trim();
                        PlannedRow::Malformed {
                            error,
                            label: (!course.is_empty()).then(|| course.to_string()),
                        }
                    }
                    Err(PlanError::TermRange(err)) => return Err(err),
                },
                Err(error) => PlannedRow::Malformed {
                    error: error.clone(),
                    label: None,
                },
            };
            rows.push(planned);
        }
        Ok(rows)
    }
}
