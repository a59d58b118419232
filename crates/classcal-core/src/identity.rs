//! Deterministic event identities.
//!
//! The identity of a session is derived only from the fields that define the
//! class meeting itself: course label, session type, weekday, start time and
//! section. Term dates and location are deliberately left out, so re-running
//! the same timetable next term (or after a room change) finds the existing
//! event instead of creating a second one.
//!
//! Google Calendar event ids must use the base32hex alphabet (`0-9`, `a-v`)
//! and be 5 to 1024 characters long. A `cls` prefix followed by lowercase hex
//! digits satisfies both.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::schedule::{weekday_name, SessionDefinition};

/// Prefix of every generated id.
pub const IDENTITY_PREFIX: &str = "cls";
/// Number of hex digits kept from the digest (80 bits).
pub const IDENTITY_HEX_LEN: usize = 20;

const FIELD_SEPARATOR: char = '\u{1f}';

/// Stable idempotency key for one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventIdentity(String);

impl EventIdentity {
    /// Derive the identity of a session.
    pub fn for_session(session: &SessionDefinition) -> Self {
        let digest = Sha256::digest(canonical_key(session).as_bytes());
        let hex = hex::encode(digest);
        EventIdentity(format!("{IDENTITY_PREFIX}{}", &hex[..IDENTITY_HEX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `id` is acceptable as a Google Calendar event id.
    pub fn is_valid_event_id(id: &str) -> bool {
        (5..=1024).contains(&id.len())
            && id
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c))
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical text hashed into the identity.
fn canonical_key(session: &SessionDefinition) -> String {
    let fields = [
        normalize(&session.course),
        normalize(&session.session_type.key()),
        weekday_name(session.weekday).to_lowercase(),
        session.start.format("%H:%M").to_string(),
        normalize(session.section.as_deref().unwrap_or("")),
    ];
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// Lowercase, collapse whitespace runs, drop separator characters.
fn normalize(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(FIELD_SEPARATOR, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::SessionType;
    use chrono::{NaiveTime, Weekday};
    use proptest::prelude::*;

    fn session() -> SessionDefinition {
        SessionDefinition {
            course: "MATH101".into(),
            course_name: Some("Calculus I".into()),
            session_type: SessionType::Lecture,
            weekday: Weekday::Mon,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            location: "RoomA".into(),
            section: None,
        }
    }

    #[test]
    fn test_known_identity() {
        // Pinned so that ids stay stable across releases and machines.
        assert_eq!(EventIdentity::for_session(&session()).as_str(), "cls1e55ac13fa96d248ddb6");

        let lab = SessionDefinition {
            course: "CHEM200".into(),
            session_type: SessionType::Lab,
            weekday: Weekday::Thu,
            start: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            section: Some("B2".into()),
            ..session()
        };
        assert_eq!(EventIdentity::for_session(&lab).as_str(), "cls077d7f3b70c47c473c85");
    }

    #[test]
    fn test_identity_is_valid_google_id() {
        let id = EventIdentity::for_session(&session());
        assert_eq!(id.as_str().len(), IDENTITY_PREFIX.len() + IDENTITY_HEX_LEN);
        assert!(EventIdentity::is_valid_event_id(id.as_str()));
    }

    #[test]
    fn test_valid_event_id_alphabet() {
        assert!(EventIdentity::is_valid_event_id("abcde01234"));
        assert!(!EventIdentity::is_valid_event_id("abcw1"));
        assert!(!EventIdentity::is_valid_event_id("ABCDE"));
        assert!(!EventIdentity::is_valid_event_id("ab1"));
    }

    #[test]
    fn test_ignores_location_name_and_end() {
        let base = EventIdentity::for_session(&session());
        let moved = SessionDefinition {
            location: "Hall B".into(),
            course_name: Some("Renamed".into()),
            end: NaiveTime::from_hms_opt(10, 50, 0).unwrap(),
            ..session()
        };
        assert_eq!(EventIdentity::for_session(&moved), base);
    }

    #[test]
    fn test_case_and_spacing_insensitive_course() {
        let base = EventIdentity::for_session(&session());
        let spaced = SessionDefinition {
            course: " math101 ".into(),
            ..session()
        };
        assert_eq!(EventIdentity::for_session(&spaced), base);
    }

    #[test]
    fn test_section_distinguishes_sessions() {
        let a = SessionDefinition {
            section: Some("A".into()),
            ..session()
        };
        let b = SessionDefinition {
            section: Some("B".into()),
            ..session()
        };
        assert_ne!(EventIdentity::for_session(&a), EventIdentity::for_session(&b));
        assert_ne!(EventIdentity::for_session(&a), EventIdentity::for_session(&session()));
    }

    fn weekday_strategy() -> impl Strategy<Value = Weekday> {
        (0u32..7).prop_map(|n| Weekday::try_from(n as u8).unwrap())
    }

    proptest! {
        #[test]
        fn prop_identity_deterministic(course in "[A-Z]{2,4}[0-9]{3}", hour in 0u32..23, minute in 0u32..60) {
            let s = SessionDefinition {
                course,
                start: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
                end: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
                ..session()
            };
            prop_assert_eq!(EventIdentity::for_session(&s), EventIdentity::for_session(&s.clone()));
        }

        #[test]
        fn prop_identity_stable_under_location(location in ".{0,40}") {
            let moved = SessionDefinition { location, ..session() };
            prop_assert_eq!(EventIdentity::for_session(&moved), EventIdentity::for_session(&session()));
        }

        #[test]
        fn prop_weekday_or_start_changes_identity(day in weekday_strategy(), hour in 0u32..9) {
            let other = SessionDefinition {
                weekday: day,
                start: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
                ..session()
            };
            prop_assert_ne!(EventIdentity::for_session(&other), EventIdentity::for_session(&session()));
        }

        #[test]
        fn prop_course_or_type_changes_identity(course in "[A-Z]{4}[0-9]{3}", lab in any::<bool>()) {
            let other = SessionDefinition {
                course,
                session_type: if lab { SessionType::Lab } else { SessionType::Tutorial },
                ..session()
            };
            prop_assert_ne!(EventIdentity::for_session(&other), EventIdentity::for_session(&session()));
        }
    }
}
