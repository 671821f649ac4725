//! Conversion of loosely typed user input (dates, datetimes, strings, years)
//! into concrete UTC instant ranges.
//!
//! Values that carry no offset (`NaiveDate`, `NaiveDateTime`, plain date
//! strings, [`Year`]) are interpreted in the machine's local time zone, which is
//! the same zone the chill-hour buckets are drawn in.

use crate::types::traits::types::{StartEndDateTime, Year};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub trait AnyDateTime {
    fn get_datetime_range(self) -> Option<StartEndDateTime>;
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl AnyDateTime for NaiveDateTime {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        let dt = local_to_utc(self)?;
        Some(StartEndDateTime { start: dt, end: dt })
    }
}

impl AnyDateTime for DateTime<Local> {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        let dt = self.with_timezone(&Utc);
        Some(StartEndDateTime { start: dt, end: dt })
    }
}

impl AnyDateTime for DateTime<Utc> {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        Some(StartEndDateTime {
            start: self,
            end: self,
        })
    }
}

impl AnyDateTime for DateTime<FixedOffset> {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        let dt = self.with_timezone(&Utc);
        Some(StartEndDateTime { start: dt, end: dt })
    }
}

impl AnyDateTime for NaiveDate {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        let start = local_to_utc(self.and_hms_opt(0, 0, 0)?)?;
        let end = local_to_utc(self.and_hms_milli_opt(23, 59, 59, 999)?)?;
        Some(StartEndDateTime { start, end })
    }
}

impl AnyDateTime for &str {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        if let Ok(dt) = self.parse::<DateTime<Utc>>() {
            return dt.get_datetime_range();
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(self) {
            return dt.get_datetime_range();
        }
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(self, "%Y-%m-%d %H:%M:%S") {
            return naive_dt.get_datetime_range();
        }
        if let Ok(naive_date) = NaiveDate::parse_from_str(self, "%Y-%m-%d") {
            return naive_date.get_datetime_range();
        }
        None
    }
}

impl AnyDateTime for String {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        self.as_str().get_datetime_range()
    }
}

impl AnyDateTime for Year {
    fn get_datetime_range(self) -> Option<StartEndDateTime> {
        Some(StartEndDateTime {
            start: NaiveDate::from_ymd_opt(self.0, 1, 1)?
                .get_datetime_range()?
                .start,
            end: NaiveDate::from_ymd_opt(self.0, 12, 31)?
                .get_datetime_range()?
                .end,
        })
    }
}
