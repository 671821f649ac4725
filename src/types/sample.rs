//! Temperature readings and device metadata as handed out by a data source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single outdoor temperature reading from a weather station.
///
/// On the wire the timestamp is epoch milliseconds; in memory it is a
/// [`DateTime<Utc>`]. Samples are immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub temperature_f: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, temperature_f: f64) -> Self {
        Self {
            timestamp,
            temperature_f,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// A weather station registered to the API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// MAC address, used as the device identifier by the API.
    pub mac_address: String,
    /// User-assigned station name, if any.
    pub name: Option<String>,
    /// Free-form location description, if any.
    pub location: Option<String>,
    /// Time of the most recent reading the API knows about.
    pub last_reading_at: Option<DateTime<Utc>>,
    /// Outdoor temperature of the most recent reading.
    pub last_temperature_f: Option<f64>,
}
