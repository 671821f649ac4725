use crate::source::data_source::DataSource;
use crate::source::error::SourceError;
use crate::types::sample::{DeviceInfo, Sample};
use bon::bon;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.ambientweather.net";

/// One reading as the Ambient Weather REST API returns it. Only the fields
/// this crate needs are decoded; indoor-only records have no `tempf`.
#[derive(Debug, Deserialize)]
struct AmbientRecord {
    dateutc: i64,
    tempf: Option<f64>,
}

impl AmbientRecord {
    fn into_sample(self) -> Option<Sample> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(self.dateutc)?;
        Some(Sample::new(timestamp, self.tempf?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmbientDevice {
    mac_address: String,
    #[serde(default)]
    info: Option<AmbientDeviceInfo>,
    #[serde(default)]
    last_data: Option<AmbientRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct AmbientDeviceInfo {
    name: Option<String>,
    location: Option<String>,
}

impl From<AmbientDevice> for DeviceInfo {
    fn from(device: AmbientDevice) -> Self {
        let info = device.info.unwrap_or_default();
        let last_reading_at = device
            .last_data
            .as_ref()
            .and_then(|record| DateTime::<Utc>::from_timestamp_millis(record.dateutc));
        DeviceInfo {
            mac_address: device.mac_address,
            name: info.name,
            location: info.location,
            last_reading_at,
            last_temperature_f: device.last_data.and_then(|record| record.tempf),
        }
    }
}

/// HTTP client for the Ambient Weather REST API.
///
/// Requests are authenticated with an API key and, optionally, an
/// application key, both sent as query parameters. The keys never appear in
/// logged URLs or error messages.
pub struct AmbientClient {
    client: Client,
    base_url: String,
    api_key: String,
    application_key: Option<String>,
}

#[bon]
impl AmbientClient {
    /// # Examples
    ///
    /// ```
    /// use chillhours::AmbientClient;
    ///
    /// let client = AmbientClient::builder()
    ///     .api_key("my-api-key")
    ///     .application_key("my-application-key")
    ///     .build();
    /// ```
    #[builder]
    pub fn new(
        #[builder(into)] api_key: String,
        #[builder(into)] application_key: Option<String>,
        #[builder(into)] base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client: Client::new(),
            base_url,
            api_key,
            application_key,
        }
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("apiKey", self.api_key.as_str())];
        if let Some(application_key) = &self.application_key {
            query.push(("applicationKey", application_key.as_str()));
        }
        query
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        debug!("Requesting {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&self.auth_query())
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.clone(), e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HTTP error for {}: {} {}", url, status, body);
            return Err(SourceError::HttpStatus { url, status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(url, e.without_url()))
    }
}

impl DataSource for AmbientClient {
    async fn fetch_page(
        &self,
        device_id: &str,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Sample>, SourceError> {
        let url = format!("{}/v1/devices/{}", self.base_url, device_id);
        let query = [
            ("endDate", end.timestamp_millis().to_string()),
            ("limit", limit.to_string()),
        ];
        let records: Vec<AmbientRecord> = self.get_json(url, &query).await?;

        let received = records.len();
        let samples: Vec<Sample> = records
            .into_iter()
            .filter_map(AmbientRecord::into_sample)
            .collect();
        if samples.len() < received {
            debug!(
                "Skipped {} records without an outdoor temperature for {}",
                received - samples.len(),
                device_id
            );
        }
        info!(
            "Fetched {} samples for {} ending at {}",
            samples.len(),
            device_id,
            end
        );
        Ok(samples)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SourceError> {
        let url = format!("{}/v1/devices", self.base_url);
        let devices: Vec<AmbientDevice> = self.get_json(url, &[]).await?;
        Ok(devices.into_iter().map(DeviceInfo::from).collect())
    }
}
