use chrono::{DateTime, Utc};

/// A calendar year, e.g. the target year of a chill season.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Year(pub i32);

/// An inclusive instant range, normalised to UTC.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StartEndDateTime {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
