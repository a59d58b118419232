//! CSV schedule reading.
//!
//! Headers are matched loosely (case, spaces and punctuation ignored) so that
//! both the documented column names and the historical `Course Code` /
//! `Course Name` layout are accepted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::ScheduleRow;
use crate::error::{MalformedRowError, RowField, ScheduleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Course,
    CourseName,
    SessionType,
    Day,
    StartTime,
    EndTime,
    Location,
    Section,
}

impl Column {
    const REQUIRED: [Column; 5] = [
        Column::Course,
        Column::Day,
        Column::StartTime,
        Column::EndTime,
        Column::Location,
    ];

    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .trim_start_matches('\u{feff}')
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let column = match key.as_str() {
            "coursecode" | "course" | "code" | "courselabel" | "label" => Column::Course,
            "coursename" | "name" | "title" => Column::CourseName,
            "sessiontype" | "type" | "session" => Column::SessionType,
            "day" | "weekday" | "dayofweek" => Column::Day,
            "starttime" | "start" => Column::StartTime,
            "endtime" | "end" => Column::EndTime,
            "location" | "room" => Column::Location,
            "section" | "group" => Column::Section,
            _ => return None,
        };
        Some(column)
    }

    fn display_name(self) -> &'static str {
        match self {
            Column::Course => "Course Code",
            Column::CourseName => "Course Name",
            Column::SessionType => "Session Type",
            Column::Day => "Day",
            Column::StartTime => "Start Time",
            Column::EndTime => "End Time",
            Column::Location => "Location",
            Column::Section => "Section",
        }
    }
}

/// Positions of the recognised columns within a header row.
#[derive(Debug, Default)]
struct ColumnMap {
    course: Option<usize>,
    course_name: Option<usize>,
    session_type: Option<usize>,
    day: Option<usize>,
    start_time: Option<usize>,
    end_time: Option<usize>,
    location: Option<usize>,
    section: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, ScheduleError> {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(column) = Column::from_header(header) {
                let slot = map.slot(column);
                // First matching header wins.
                if slot.is_none() {
                    *slot = Some(idx);
                }
            }
        }

        let missing: Vec<&'static str> = Column::REQUIRED
            .iter()
            .filter(|c| map.position(**c).is_none())
            .map(|c| c.display_name())
            .collect();
        if !missing.is_empty() {
            return Err(ScheduleError::MissingColumns(missing));
        }
        Ok(map)
    }

    fn slot(&mut self, column: Column) -> &mut Option<usize> {
        match column {
            Column::Course => &mut self.course,
            Column::CourseName => &mut self.course_name,
            Column::SessionType => &mut self.session_type,
            Column::Day => &mut self.day,
            Column::StartTime => &mut self.start_time,
            Column::EndTime => &mut self.end_time,
            Column::Location => &mut self.location,
            Column::Section => &mut self.section,
        }
    }

    fn position(&self, column: Column) -> Option<usize> {
        match column {
            Column::Course => self.course,
            Column::CourseName => self.course_name,
            Column::SessionType => self.session_type,
            Column::Day => self.day,
            Column::StartTime => self.start_time,
            Column::EndTime => self.end_time,
            Column::Location => self.location,
            Column::Section => self.section,
        }
    }

    fn row(&self, record: &StringRecord) -> ScheduleRow {
        let cell = |pos: Option<usize>| pos.map(|i| record.get(i).unwrap_or("").trim().to_string());
        ScheduleRow {
            course: cell(self.course).unwrap_or_default(),
            course_name: cell(self.course_name),
            session_type: cell(self.session_type),
            day: cell(self.day).unwrap_or_default(),
            start_time: cell(self.start_time).unwrap_or_default(),
            end_time: cell(self.end_time).unwrap_or_default(),
            location: cell(self.location).unwrap_or_default(),
            section: cell(self.section),
        }
    }
}

/// A numbered schedule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    /// 1-based data row number.
    pub index: usize,
    pub row: ScheduleRow,
}

/// All lines of a schedule file, in input order. Lines that could not be
/// decoded are kept as errors so the driver can report them.
#[derive(Debug, Default)]
pub struct Schedule {
    pub records: Vec<Result<ScheduleRecord, MalformedRowError>>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read a schedule CSV file from disk.
pub fn read_schedule(path: &Path) -> Result<Schedule, ScheduleError> {
    if !path.exists() {
        return Err(ScheduleError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(csv::Error::from)?;
    read_schedule_from(file)
}

/// Read a schedule from any CSV source. A header row is required.
pub fn read_schedule_from<R: Read>(source: R) -> Result<Schedule, ScheduleError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut schedule = Schedule::default();
    for (offset, result) in reader.records().enumerate() {
        let index = offset + 1;
        match result {
            Ok(record) => schedule.records.push(Ok(ScheduleRecord {
                index,
                row: columns.row(&record),
            })),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => schedule
                .records
                .push(Err(MalformedRowError::new(index, RowField::Record, err.to_string()))),
        }
    }

    tracing::debug!(rows = schedule.len(), "read schedule");
    Ok(schedule)
}
