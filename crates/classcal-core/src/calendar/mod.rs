//! Remote calendar access.
//!
//! The sync driver only needs two operations from a calendar: look an event
//! up by its [`EventIdentity`] and create one. [`CalendarService`] captures
//! exactly that so the driver can run against Google Calendar in production
//! and an in-memory fake in tests.

pub mod google;
pub mod retry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidTermRangeError, RemoteError};
use crate::identity::EventIdentity;
use crate::recurrence::RecurrenceSpec;
use crate::schedule::SessionDefinition;

pub use google::GoogleCalendarClient;
pub use retry::RetryPolicy;

/// Private extended property holding the identity.
pub const IDENTITY_PROPERTY: &str = "classcal_id";
const VERSION_PROPERTY: &str = "classcal_version";
const COURSE_PROPERTY: &str = "classcal_course";
const SESSION_PROPERTY: &str = "classcal_session";
const PAYLOAD_VERSION: &str = "1";

/// Operations this system requires from a calendar backend.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Find an event whose metadata carries `identity`.
    async fn find_event_by_identity(
        &self,
        calendar_id: &str,
        identity: &EventIdentity,
    ) -> Result<Option<RemoteEvent>, RemoteError>;

    /// Create a new event.
    async fn create_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<RemoteEvent, RemoteError>;
}

/// An event as returned by the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// Local wall-clock time plus IANA zone, as Google Calendar expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default)]
    pub private: BTreeMap<String, String>,
}

/// Request body for creating one recurring class event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub location: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub recurrence: Vec<String>,
    pub extended_properties: ExtendedProperties,
}

impl EventPayload {
    /// Compose the payload for `session` repeating per `recurrence`.
    pub fn build(
        session: &SessionDefinition,
        recurrence: &RecurrenceSpec,
        identity: &EventIdentity,
    ) -> Result<Self, InvalidTermRangeError> {
        let time_zone = recurrence.timezone.name().to_string();
        let local = |dt: chrono::NaiveDateTime| EventDateTime {
            date_time: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: time_zone.clone(),
        };

        let mut private = BTreeMap::new();
        private.insert(IDENTITY_PROPERTY.to_string(), identity.to_string());
        private.insert(VERSION_PROPERTY.to_string(), PAYLOAD_VERSION.to_string());
        private.insert(COURSE_PROPERTY.to_string(), session.course.clone());
        private.insert(SESSION_PROPERTY.to_string(), session.session_type.key());

        Ok(Self {
            id: identity.to_string(),
            summary: session.title(),
            location: session.location.clone(),
            description: session.description(),
            start: local(recurrence.first_start(session)),
            end: local(recurrence.first_end(session)),
            recurrence: vec![recurrence.rrule()?],
            extended_properties: ExtendedProperties { private },
        })
    }

    /// Identity stored in the payload metadata.
    pub fn identity(&self) -> Option<&str> {
        self.extended_properties
            .private
            .get(IDENTITY_PROPERTY)
            .map(String::as_str)
    }
}
