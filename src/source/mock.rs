//! In-memory data sources for tests.

use crate::source::data_source::DataSource;
use crate::source::error::SourceError;
use crate::types::sample::{DeviceInfo, Sample};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) fn http_error(status: u16) -> SourceError {
    SourceError::HttpStatus {
        url: "http://mock/v1/devices/test".into(),
        status: StatusCode::from_u16(status).unwrap(),
        body: String::new(),
    }
}

/// Base URL of a local port nothing listens on, so connections are refused.
pub(crate) async fn refused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", address)
}

/// Readings every `step` from `first` through `last`, both inclusive.
pub(crate) fn readings(
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    step: Duration,
    temperature_f: f64,
) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut at = first;
    while at <= last {
        samples.push(Sample::new(at, temperature_f));
        at += step;
    }
    samples
}

/// Behaves like the real API: newest-first pages of up to `limit` samples at
/// or before the requested end. Responses queued in `failures` are returned
/// first, one per call.
pub(crate) struct HistorySource {
    history: Vec<Sample>,
    failures: Mutex<VecDeque<SourceError>>,
    calls: Mutex<Vec<DateTime<Utc>>>,
}

impl HistorySource {
    pub(crate) fn new(history: Vec<Sample>) -> Self {
        Self {
            history,
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_first(self, failures: Vec<SourceError>) -> Self {
        *self.failures.lock().unwrap() = failures.into();
        self
    }

    pub(crate) fn calls(&self) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap().clone()
    }
}

impl DataSource for HistorySource {
    async fn fetch_page(
        &self,
        _device_id: &str,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Sample>, SourceError> {
        self.calls.lock().unwrap().push(end);
        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure);
        }
        let mut page: Vec<Sample> = self
            .history
            .iter()
            .filter(|sample| sample.timestamp <= end)
            .copied()
            .collect();
        page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        page.truncate(limit);
        Ok(page)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SourceError> {
        Ok(vec![DeviceInfo {
            mac_address: "00:11:22:33:44:55".into(),
            name: Some("Mock".into()),
            location: None,
            last_reading_at: self.history.iter().map(|s| s.timestamp).max(),
            last_temperature_f: None,
        }])
    }
}

/// Replays a fixed script of page responses, then empty pages.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Sample>, SourceError>>>,
    calls: Mutex<usize>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<Vec<Sample>, SourceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl DataSource for ScriptedSource {
    async fn fetch_page(
        &self,
        _device_id: &str,
        _end: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<Sample>, SourceError> {
        *self.calls.lock().unwrap() += 1;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SourceError> {
        Ok(Vec::new())
    }
}
