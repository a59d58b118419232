//! Class schedule rows and the session definitions derived from them.
//!
//! A [`ScheduleRow`] holds the raw, trimmed text of one CSV line. Parsing it
//! yields a [`SessionDefinition`]: a validated weekly class meeting with a
//! canonical weekday, a time-of-day range and a session type.

pub mod reader;

use std::fmt;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{MalformedRowError, RowField};

pub use reader::{read_schedule, read_schedule_from, Schedule, ScheduleRecord};

/// Kind of class meeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Lecture,
    Lab,
    Tutorial,
    /// Any other non-empty label, kept as written.
    Other(String),
}

impl SessionType {
    /// Parse a session type label (case-insensitive for the known kinds).
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        let kind = match label.to_lowercase().as_str() {
            "lecture" | "lec" => SessionType::Lecture,
            "lab" | "laboratory" => SessionType::Lab,
            "tutorial" | "tut" => SessionType::Tutorial,
            _ => SessionType::Other(label.to_string()),
        };
        Some(kind)
    }

    /// Infer the type from a course name when the schedule has no type column.
    pub fn infer_from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("lab") {
            SessionType::Lab
        } else if lower.contains("tutorial") {
            SessionType::Tutorial
        } else {
            SessionType::Lecture
        }
    }

    /// Stable lowercase key used in event identities and metadata.
    pub fn key(&self) -> String {
        match self {
            SessionType::Lecture => "lecture".to_string(),
            SessionType::Lab => "lab".to_string(),
            SessionType::Tutorial => "tutorial".to_string(),
            SessionType::Other(label) => label.to_lowercase(),
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Lecture => f.write_str("Lecture"),
            SessionType::Lab => f.write_str("Lab"),
            SessionType::Tutorial => f.write_str("Tutorial"),
            SessionType::Other(label) => f.write_str(label),
        }
    }
}

/// Raw fields of one schedule line, trimmed but otherwise unvalidated.
///
/// Optional columns are `None` when the schedule has no such column at all,
/// and `Some("")` when the column exists but the cell is blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub course: String,
    pub course_name: Option<String>,
    pub session_type: Option<String>,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub section: Option<String>,
}

/// One validated weekly class meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefinition {
    pub course: String,
    pub course_name: Option<String>,
    pub session_type: SessionType,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub location: String,
    pub section: Option<String>,
}

impl SessionDefinition {
    /// Event title, e.g. `MATH101 - Calculus I (Lecture) [A1]`.
    pub fn title(&self) -> String {
        let mut title = match &self.course_name {
            Some(name) => format!("{} - {} ({})", self.course, name, self.session_type),
            None => format!("{} ({})", self.course, self.session_type),
        };
        if let Some(section) = &self.section {
            title.push_str(&format!(" [{section}]"));
        }
        title
    }

    /// Event description lines.
    pub fn description(&self) -> String {
        let mut lines = vec![format!("Session: {}", self.session_type)];
        lines.push(format!(
            "Course: {}",
            self.course_name.as_deref().unwrap_or(&self.course)
        ));
        if let Some(section) = &self.section {
            lines.push(format!("Section: {section}"));
        }
        lines.join("\n")
    }
}

impl ScheduleRow {
    /// Validate this row into a session. `row` is the 1-based data row number
    /// used in error reports.
    pub fn parse(&self, row: usize) -> Result<SessionDefinition, MalformedRowError> {
        let course = self.course.trim();
        if course.is_empty() {
            return Err(MalformedRowError::new(row, RowField::Course, "course label is empty"));
        }

        let course_name = non_empty(self.course_name.as_deref());

        let session_type = match self.session_type.as_deref() {
            Some(label) => SessionType::parse(label).ok_or_else(|| {
                MalformedRowError::new(row, RowField::SessionType, "session type is empty")
            })?,
            None => SessionType::infer_from_name(course_name.as_deref().unwrap_or(course)),
        };

        let weekday = parse_weekday(&self.day).ok_or_else(|| {
            MalformedRowError::new(
                row,
                RowField::Day,
                format!("unknown weekday '{}'", self.day.trim()),
            )
        })?;

        let start = parse_time_of_day(&self.start_time).ok_or_else(|| {
            MalformedRowError::new(
                row,
                RowField::StartTime,
                format!("cannot parse '{}' as a time of day", self.start_time.trim()),
            )
        })?;
        let end = parse_time_of_day(&self.end_time).ok_or_else(|| {
            MalformedRowError::new(
                row,
                RowField::EndTime,
                format!("cannot parse '{}' as a time of day", self.end_time.trim()),
            )
        })?;
        if start >= end {
            return Err(MalformedRowError::new(
                row,
                RowField::EndTime,
                format!(
                    "end {} is not after start {}",
                    end.format("%H:%M"),
                    start.format("%H:%M")
                ),
            ));
        }

        Ok(SessionDefinition {
            course: course.to_string(),
            course_name,
            session_type,
            weekday,
            start,
            end,
            location: self.location.trim().to_string(),
            section: non_empty(self.section.as_deref()),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Match a full English weekday name, case-insensitively.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    let day = match name.trim().to_lowercase().as_str() {
        "monday" => Weekday::Mon,
        "tuesday" => Weekday::Tue,
        "wednesday" => Weekday::Wed,
        "thursday" => Weekday::Thu,
        "friday" => Weekday::Fri,
        "saturday" => Weekday::Sat,
        "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Canonical English name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

const TIME_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Parse `HH:MM` (24-hour), also accepting `HH:MM:00` and 12-hour `h:MM AM`.
///
/// Identities and event times have minute precision, so non-zero seconds
/// are rejected rather than dropped.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .filter(|time| time.second() == 0)
}
