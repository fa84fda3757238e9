// Export rows shared by every export format
use super::device::DeviceInfo;
use super::telemetry::SeriesSet;
use super::time_range::TimeRange;
use chrono::{DateTime, SecondsFormat};
use serde::Serialize;

pub const EXPORT_HEADER: [&str; 3] = ["Time", "Key", "Value"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub time: String,
    pub key: String,
    pub value: String,
}

/// A rendered export file, ready to be written or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Flattens every series into one time-ordered list. Rows sharing a timestamp
/// keep key order, then sample order.
pub fn flatten(set: &SeriesSet) -> Vec<ExportRow> {
    let mut stamped: Vec<(i64, ExportRow)> = set
        .iter()
        .flat_map(|series| {
            series.samples.iter().map(|sample| {
                (
                    sample.timestamp,
                    ExportRow {
                        time: iso_time(sample.timestamp),
                        key: series.key.clone(),
                        value: sample.value.to_string(),
                    },
                )
            })
        })
        .collect();

    stamped.sort_by_key(|(timestamp, _)| *timestamp);
    stamped.into_iter().map(|(_, row)| row).collect()
}

/// ISO-8601 UTC with milliseconds, e.g. `2023-11-14T22:13:20.000Z`.
pub fn iso_time(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// `telemetry_<device>_<start>_<end>.<ext>`, dates as `YYYYMMDD` in UTC.
pub fn artifact_name(device: &DeviceInfo, range: &TimeRange, extension: &str) -> String {
    let day = |ms: i64| {
        DateTime::from_timestamp_millis(ms)
            .map(|t| t.format("%Y%m%d").to_string())
            .unwrap_or_else(|| ms.to_string())
    };
    format!(
        "telemetry_{}_{}_{}.{}",
        device.slug(),
        day(range.start),
        day(range.end),
        extension
    )
}
