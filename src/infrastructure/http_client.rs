// HTTP telemetry client for the time-series backend
use crate::application::telemetry_client::{CredentialProvider, TelemetryClient};
use crate::domain::device::DeviceInfo;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{RawSample, RawSeries, RawSeriesSet};
use crate::domain::time_range::TimeRange;
use crate::infrastructure::config::{BackendSettings, prepare_path};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct HttpTelemetryClient {
    host: String,
    history_path: String,
    latest_path: String,
    device_path: String,
    limit: u32,
    credentials: Arc<dyn CredentialProvider>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DeviceResponse {
    name: String,
    #[serde(default, rename = "type")]
    device_type: Option<String>,
}

impl HttpTelemetryClient {
    pub fn new(
        settings: &BackendSettings,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TelemetryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            host: settings.host.trim_end_matches('/').to_string(),
            history_path: settings.history_path.clone(),
            latest_path: settings.latest_path.clone(),
            device_path: settings.device_path.clone(),
            limit: settings.limit,
            credentials,
            http,
        })
    }

    fn build_url(&self, template: &str, device_id: &str, params: &[(&str, String)]) -> String {
        let mut vars = HashMap::new();
        vars.insert("deviceId", urlencoding::encode(device_id).into_owned());
        let path = prepare_path(template, &vars);

        let query: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect();

        if query.is_empty() {
            format!("{}{}", self.host, path)
        } else {
            format!("{}{}?{}", self.host, path, query.join("&"))
        }
    }

    fn key_params(keys: Option<&[String]>) -> Vec<(&'static str, String)> {
        match keys {
            Some(keys) if !keys.is_empty() => vec![("keys", keys.join(","))],
            _ => Vec::new(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, TelemetryError> {
        let credential = self
            .credentials
            .credential()
            .ok_or(TelemetryError::MissingCredential)?;

        tracing::debug!(url, role = ?credential.role, "Requesting telemetry backend");
        let response = self
            .http
            .get(url)
            .bearer_auth(&credential.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TelemetryError::Decode(e.to_string()))
    }
}

/// Decodes `{ "<key>": [{"ts"|"timestamp": .., "value": ..}, ..], .. }`,
/// keeping the key order of the body.
pub fn parse_series_response(body: Value) -> Result<RawSeriesSet, TelemetryError> {
    let Value::Object(map) = body else {
        return Err(TelemetryError::Decode(
            "expected an object keyed by telemetry key".to_string(),
        ));
    };

    map.into_iter()
        .map(|(key, samples)| {
            let samples: Vec<RawSample> = serde_json::from_value(samples)
                .map_err(|e| TelemetryError::Decode(format!("key {}: {}", key, e)))?;
            Ok(RawSeries { key, samples })
        })
        .collect()
}

#[async_trait]
impl TelemetryClient for HttpTelemetryClient {
    async fn fetch_history(
        &self,
        device_id: &str,
        keys: Option<&[String]>,
        range: &TimeRange,
    ) -> Result<RawSeriesSet, TelemetryError> {
        let mut params = Self::key_params(keys);
        params.push(("startTs", range.start.to_string()));
        params.push(("endTs", range.end.to_string()));
        params.push(("limit", self.limit.to_string()));

        let url = self.build_url(&self.history_path, device_id, &params);
        let body = self.get_json(&url).await?;
        let raw = parse_series_response(body)?;

        tracing::debug!(device_id, keys = raw.len(), "Received telemetry history");
        Ok(raw)
    }

    async fn fetch_latest(
        &self,
        device_id: &str,
        keys: Option<&[String]>,
    ) -> Result<RawSeriesSet, TelemetryError> {
        let url = self.build_url(&self.latest_path, device_id, &Self::key_params(keys));
        let body = self.get_json(&url).await?;
        parse_series_response(body)
    }

    async fn describe_device(&self, device_id: &str) -> Result<DeviceInfo, TelemetryError> {
        let url = self.build_url(&self.device_path, device_id, &[]);
        let body = self.get_json(&url).await?;
        let device: DeviceResponse =
            serde_json::from_value(body).map_err(|e| TelemetryError::Decode(e.to_string()))?;

        Ok(DeviceInfo::new(device_id.to_string(), device.name, device.device_type))
    }
}
