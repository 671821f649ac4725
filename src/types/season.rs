//! The agricultural dormant season a chill-hour count is taken over.

use crate::types::error::SeasonError;
use crate::types::traits::types::StartEndDateTime;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Inclusive calendar-date window of one chill season.
///
/// Derived from a start month and a target year:
///
/// * start month `1..=6`: the 1st of the start month through Dec 31 of the
///   target year;
/// * start month `7..=12`: the 1st of the start month of the *previous* year
///   through the day before the 1st of the start month of the target year.
///
/// # Examples
///
/// ```
/// use chillhours::SeasonWindow;
/// use chrono::NaiveDate;
///
/// let window = SeasonWindow::new(9, 2023).unwrap();
/// assert_eq!(window.start, NaiveDate::from_ymd_opt(2022, 9, 1).unwrap());
/// assert_eq!(window.end, NaiveDate::from_ymd_opt(2023, 8, 31).unwrap());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    pub fn new(start_month: u32, year: i32) -> Result<Self, SeasonError> {
        if !(1..=12).contains(&start_month) {
            return Err(SeasonError::InvalidSeasonMonth(start_month));
        }

        if start_month <= 6 {
            let start = NaiveDate::from_ymd_opt(year, start_month, 1)
                .ok_or(SeasonError::InvalidYear(year))?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(SeasonError::InvalidYear(year))?;
            return Ok(Self { start, end });
        }

        let start = year
            .checked_sub(1)
            .and_then(|previous| NaiveDate::from_ymd_opt(previous, start_month, 1))
            .ok_or(SeasonError::InvalidYear(year))?;
        let end = NaiveDate::from_ymd_opt(year, start_month, 1)
            .and_then(|next_start| next_start.pred_opt())
            .ok_or(SeasonError::InvalidYear(year))?;
        Ok(Self { start, end })
    }

    /// The most recent season starting in `start_month` that has begun on or
    /// before `date`.
    pub fn latest_started(start_month: u32, date: NaiveDate) -> Result<Self, SeasonError> {
        let started_this_year = date.month() >= start_month;
        let year = match (start_month <= 6, started_this_year) {
            (true, true) => date.year(),
            (true, false) => date.year() - 1,
            (false, true) => date.year() + 1,
            (false, false) => date.year(),
        };
        Self::new(start_month, year)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Resolves the window to instants, from the first moment of `start` to
    /// the last millisecond of `end`, as observed in `tz`.
    pub fn bounds_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<StartEndDateTime> {
        let start = resolve_local(tz, self.start.and_hms_opt(0, 0, 0)?, Edge::Start)?;
        let end = resolve_local(tz, self.end.and_hms_milli_opt(23, 59, 59, 999)?, Edge::End)?;
        Some(StartEndDateTime {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }
}

enum Edge {
    Start,
    End,
}

// Wall-clock times skipped by a DST jump resolve to the nearest valid instant
// inside the window.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, edge: Edge) -> Option<DateTime<Tz>> {
    match (tz.from_local_datetime(&naive), edge) {
        (LocalResult::Single(dt), _) => Some(dt),
        (LocalResult::Ambiguous(early, _), Edge::Start) => Some(early),
        (LocalResult::Ambiguous(_, late), Edge::End) => Some(late),
        (LocalResult::None, Edge::Start) => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
        (LocalResult::None, Edge::End) => tz
            .from_local_datetime(&(naive - Duration::hours(1)))
            .latest(),
    }
}

impl Display for SeasonWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
