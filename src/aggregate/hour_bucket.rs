use crate::types::sample::Sample;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHILL_MIN_F: f64 = 32.0;
pub const DEFAULT_CHILL_MAX_F: f64 = 45.0;

/// Inclusive temperature band, in °F, that counts as chilling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChillRange {
    pub min_f: f64,
    pub max_f: f64,
}

impl Default for ChillRange {
    fn default() -> Self {
        Self {
            min_f: DEFAULT_CHILL_MIN_F,
            max_f: DEFAULT_CHILL_MAX_F,
        }
    }
}

impl ChillRange {
    pub fn new(min_f: f64, max_f: f64) -> Self {
        Self { min_f, max_f }
    }

    pub fn contains(&self, temperature_f: f64) -> bool {
        self.min_f <= temperature_f && temperature_f <= self.max_f
    }
}

/// Calendar hour a sample falls in, as seen in the bucketing time zone.
///
/// Ordering follows the calendar, so a `BTreeMap<HourKey, _>` iterates hours
/// chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl HourKey {
    pub fn of<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> Self {
        let local = timestamp.with_timezone(tz);
        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
        }
    }
}

/// Samples of one calendar hour and how many of them were in range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourBucket {
    samples: Vec<Sample>,
    in_range: usize,
}

impl HourBucket {
    pub(crate) fn push(&mut self, sample: Sample, range: &ChillRange) {
        if range.contains(sample.temperature_f) {
            self.in_range += 1;
        }
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn in_range(&self) -> usize {
        self.in_range
    }

    /// At least half of the hour's readings were in range. No minimum number
    /// of readings is required.
    pub fn is_chill(&self) -> bool {
        !self.samples.is_empty() && 2 * self.in_range >= self.samples.len()
    }
}
