use crate::source::error::SourceError;
use crate::types::sample::{DeviceInfo, Sample};
use chrono::{DateTime, Utc};

/// A paginated, time-windowed history of station readings.
///
/// The only query the history supports is "up to `limit` samples at or before
/// `end`". Pages may come back newest-first or in no particular order, so
/// callers must never rely on ordering.
#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn fetch_page(
        &self,
        device_id: &str,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Sample>, SourceError>;

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SourceError>;
}
