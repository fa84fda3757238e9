// Shared test doubles for the telemetry ports
use crate::application::telemetry_client::{Clock, TelemetryClient};
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{RawSample, RawSeries, RawSeriesSet};
use crate::domain::time_range::{RangeSelection, TimeRange};
use chrono::NaiveDate;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn raw_series(key: &str, samples: &[(i64, serde_json::Value)]) -> RawSeries {
    RawSeries {
        key: key.to_string(),
        samples: samples
            .iter()
            .map(|(timestamp, value)| RawSample {
                timestamp: *timestamp,
                value: value.clone(),
            })
            .collect(),
    }
}

pub fn date_range(start_date: NaiveDate, end_date: NaiveDate) -> RangeSelection {
    RangeSelection {
        hours: None,
        start_date: Some(start_date),
        end_date: Some(end_date),
    }
}

pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory backend. Queued responses are served first, in call order, each
/// after its delay; then the default history is returned.
#[derive(Default)]
pub struct StubClient {
    history: Mutex<RawSeriesSet>,
    latest: Mutex<RawSeriesSet>,
    queued: Mutex<VecDeque<(Duration, RawSeriesSet)>>,
    failing: AtomicBool,
    history_calls: AtomicUsize,
    latest_calls: AtomicUsize,
    last_range: Mutex<Option<TimeRange>>,
    last_keys: Mutex<Option<Vec<String>>>,
}

impl StubClient {
    pub fn with_history(history: RawSeriesSet) -> Self {
        Self {
            history: Mutex::new(history),
            ..Self::default()
        }
    }

    pub fn push_response(&self, delay: Duration, response: RawSeriesSet) {
        self.queued.lock().unwrap().push_back((delay, response));
    }

    pub fn set_latest(&self, latest: RawSeriesSet) {
        *self.latest.lock().unwrap() = latest;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<TimeRange> {
        *self.last_range.lock().unwrap()
    }

    pub fn last_keys(&self) -> Option<Vec<String>> {
        self.last_keys.lock().unwrap().clone()
    }

    fn check_failing(&self) -> Result<(), TelemetryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TelemetryError::Status {
                status: 503,
                body: "backend unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetryClient for StubClient {
    async fn fetch_history(
        &self,
        _device_id: &str,
        keys: Option<&[String]>,
        range: &TimeRange,
    ) -> Result<RawSeriesSet, TelemetryError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some(*range);
        *self.last_keys.lock().unwrap() = keys.map(<[String]>::to_vec);

        let queued = self.queued.lock().unwrap().pop_front();
        let response = match queued {
            Some((delay, response)) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => self.history.lock().unwrap().clone(),
        };

        self.check_failing()?;
        Ok(response)
    }

    async fn fetch_latest(
        &self,
        _device_id: &str,
        _keys: Option<&[String]>,
    ) -> Result<RawSeriesSet, TelemetryError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn describe_device(&self, device_id: &str) -> Result<DeviceInfo, TelemetryError> {
        self.check_failing()?;
        Ok(DeviceInfo::new(
            device_id.to_string(),
            "Boiler Room".to_string(),
            Some("thermostat".to_string()),
        ))
    }
}
