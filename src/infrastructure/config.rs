use crate::application::device_view::{LiveMode, ViewSettings};
use crate::application::live_poller::DEFAULT_CADENCE;
use crate::application::telemetry_client::Role;
use anyhow::Context;
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub view: ViewConfig,
    pub live: LiveConfig,
    /// Display unit per telemetry key, for keys no naming rule covers
    #[serde(default)]
    pub units: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub host: String,
    pub history_path: String,
    pub latest_path: String,
    pub device_path: String,
    #[serde(default)]
    pub token: Option<String>,
    pub role: Role,
    pub limit: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    pub default_hours: u32,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    pub cadence_ms: u64,
    pub mode: LiveMode,
}

impl AppConfig {
    pub fn view_settings(&self) -> anyhow::Result<ViewSettings> {
        if self.view.default_hours == 0 {
            anyhow::bail!("view.default_hours must be at least 1");
        }
        if self.live.cadence_ms == 0 {
            anyhow::bail!("live.cadence_ms must be positive");
        }
        let utc_offset = FixedOffset::east_opt(self.view.utc_offset_minutes * 60)
            .with_context(|| format!("invalid view.utc_offset_minutes {}", self.view.utc_offset_minutes))?;

        Ok(ViewSettings {
            default_hours: self.view.default_hours,
            utc_offset,
            cadence: Duration::from_millis(self.live.cadence_ms),
            units: self.units.clone(),
        })
    }
}

/// Loads `config/dashboard.*`, overridden by `DASHBOARD_<SECTION>__<KEY>` variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("backend.host", "http://localhost:8080")?
        .set_default(
            "backend.history_path",
            "/api/plugins/telemetry/DEVICE/${deviceId}/values/timeseries",
        )?
        .set_default(
            "backend.latest_path",
            "/api/plugins/telemetry/DEVICE/${deviceId}/values/timeseries",
        )?
        .set_default("backend.device_path", "/api/device/${deviceId}")?
        .set_default("backend.role", "user")?
        .set_default("backend.limit", 50_000_i64)?
        .set_default("backend.timeout_secs", 30_i64)?
        .set_default("view.default_hours", 24_i64)?
        .set_default("view.utc_offset_minutes", 0_i64)?
        .set_default("live.cadence_ms", DEFAULT_CADENCE.as_millis() as i64)?
        .set_default("live.mode", "history")?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${name}` placeholders in a path template
pub fn prepare_path(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
