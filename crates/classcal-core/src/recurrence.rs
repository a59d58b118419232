//! Weekly recurrence construction.
//!
//! A session repeats every week from its first occurrence on or after the
//! term start until the term end date, inclusive. The RRULE `UNTIL` bound is
//! the last second of the term end date in the schedule's timezone, expressed
//! in UTC, so an occurrence on the end date itself is always kept.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::InvalidTermRangeError;
use crate::schedule::SessionDefinition;

/// Inclusive span of dates over which sessions repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TermRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidTermRangeError> {
        if end < start {
            return Err(InvalidTermRangeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Recurrence frequency. Only weekly repetition is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Weekly,
}

/// Weekly repetition of one session over a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub first_date: NaiveDate,
    pub frequency: Frequency,
    /// Last date on which an occurrence may fall (inclusive).
    pub until_date: NaiveDate,
    pub timezone: Tz,
}

impl RecurrenceSpec {
    /// Local start of the first occurrence.
    pub fn first_start(&self, session: &SessionDefinition) -> NaiveDateTime {
        self.first_date.and_time(session.start)
    }

    /// Local end of the first occurrence.
    pub fn first_end(&self, session: &SessionDefinition) -> NaiveDateTime {
        self.first_date.and_time(session.end)
    }

    /// UTC instant used as the RRULE `UNTIL` bound.
    pub fn until_instant(&self) -> Result<DateTime<Utc>, InvalidTermRangeError> {
        end_of_day_utc(self.until_date, self.timezone)
    }

    /// RFC 5545 rule line, e.g. `RRULE:FREQ=WEEKLY;UNTIL=20240427T035959Z`.
    pub fn rrule(&self) -> Result<String, InvalidTermRangeError> {
        let until = self.until_instant()?;
        let freq = match self.frequency {
            Frequency::Weekly => "WEEKLY",
        };
        Ok(format!(
            "RRULE:FREQ={freq};UNTIL={}",
            until.format("%Y%m%dT%H%M%SZ")
        ))
    }

    /// Every occurrence date in the term, for previews and tests.
    pub fn occurrence_dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = self.first_date;
        while date <= self.until_date {
            dates.push(date);
            match date.checked_add_signed(Duration::weeks(1)) {
                Some(next) => date = next,
                None => break,
            }
        }
        dates
    }
}

/// First date on or after `from` that falls on `weekday` (0 to 6 days later).
pub fn first_occurrence(
    from: NaiveDate,
    weekday: Weekday,
) -> Result<NaiveDate, InvalidTermRangeError> {
    let delta = (weekday.num_days_from_monday() + 7 - from.weekday().num_days_from_monday()) % 7;
    from.checked_add_signed(Duration::days(i64::from(delta)))
        .ok_or(InvalidTermRangeError::OutOfRange(from))
}

/// Build the weekly recurrence of `session` over `term`.
pub fn build_recurrence(
    session: &SessionDefinition,
    term: &TermRange,
    timezone: Tz,
) -> Result<RecurrenceSpec, InvalidTermRangeError> {
    let first = first_occurrence(term.start(), session.weekday)?;
    if first > term.end() {
        return Err(InvalidTermRangeError::WeekdayOutsideTerm {
            weekday: session.weekday,
            first,
            end: term.end(),
        });
    }
    Ok(RecurrenceSpec {
        first_date: first,
        frequency: Frequency::Weekly,
        until_date: term.end(),
        timezone,
    })
}

/// Last second of `date` in `tz`, as a UTC instant.
fn end_of_day_utc(date: NaiveDate, tz: Tz) -> Result<DateTime<Utc>, InvalidTermRangeError> {
    let next_midnight = date
        .succ_opt()
        .ok_or(InvalidTermRangeError::OutOfRange(date))?
        .and_time(NaiveTime::MIN);

    let start_of_next_day = match tz.from_local_datetime(&next_midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump: use the offset in force at that moment.
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&next_midnight).fix();
            let utc = next_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
            Utc.from_utc_datetime(&utc)
        }
    };
    Ok(start_of_next_day - Duration::seconds(1))
}
