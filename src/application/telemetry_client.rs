// Ports the telemetry core depends on
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::RawSeriesSet;
use crate::domain::time_range::TimeRange;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Access to the remote time-series backend.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    /// Samples for `keys` (all keys when `None`) within `range`.
    async fn fetch_history(
        &self,
        device_id: &str,
        keys: Option<&[String]>,
        range: &TimeRange,
    ) -> Result<RawSeriesSet, TelemetryError>;

    /// The most recent sample of each key.
    async fn fetch_latest(
        &self,
        device_id: &str,
        keys: Option<&[String]>,
    ) -> Result<RawSeriesSet, TelemetryError>;

    async fn describe_device(&self, device_id: &str) -> Result<DeviceInfo, TelemetryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub role: Role,
}

/// Supplies the bearer credential. Read on every request, never cached.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
