//! # classcal Core Library
//!
//! Imports a class timetable (CSV) into Google Calendar as weekly recurring
//! events. Repeated runs never duplicate an event: every session gets a
//! deterministic identity that doubles as the remote event id and is stored
//! in the event's private metadata, so a run looks it up before creating.
//!
//! ## Architecture
//!
//! - **Schedule**: CSV reading and row validation into session definitions
//! - **Recurrence**: first occurrence in the term and the weekly RRULE
//! - **Identity**: stable event ids derived from the session itself
//! - **Calendar**: the `CalendarService` seam and its Google implementation
//! - **Sync**: the single sequential pass and its per-row report
//!
//! ## Key Components
//!
//! - [`SyncDriver`]: runs one pass over a [`Schedule`]
//! - [`Config`]: configuration loading and validation
//! - [`Authenticator`]: OAuth sign-in and token refresh
//! - [`GoogleCalendarClient`]: Google Calendar v3 REST client

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod identity;
pub mod recurrence;
pub mod schedule;
pub mod sync;

pub use auth::{AccessTokenProvider, Authenticator, ClientSecrets, KeyringTokenStore, TokenStore};
pub use calendar::{CalendarService, EventPayload, GoogleCalendarClient, RemoteEvent, RetryPolicy};
pub use config::{Config, ResolvedConfig};
pub use error::{
    ConfigError, CoreError, InvalidTermRangeError, MalformedRowError, OAuthError, PlanError,
    RemoteError, ScheduleError,
};
pub use identity::EventIdentity;
pub use recurrence::{build_recurrence, first_occurrence, RecurrenceSpec, TermRange};
pub use schedule::{read_schedule, Schedule, ScheduleRow, SessionDefinition, SessionType};
pub use sync::{PlannedEvent, PlannedRow, Planner, SyncDriver, SyncReport};
