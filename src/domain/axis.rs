// Chart axis planning
use super::telemetry::Series;
use super::time_range::{HOUR_MS, TimeRange};
use super::units::detect_unit;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Above this many points the stride targets twenty labels instead of ten.
const DENSE_SERIES: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub timestamp: i64,
    pub label: String,
}

/// Display metadata for one series: its unit and time-axis labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartAnnotation {
    pub key: String,
    pub unit: String,
    pub ticks: Vec<AxisTick>,
}

pub fn tick_stride(n: usize) -> usize {
    let stride = if n > DENSE_SERIES { n / 20 } else { n / 10 };
    stride.max(1)
}

/// Timestamps to label on the time axis: every stride-th sample starting with
/// the first. At most 21 ticks for any series length.
pub fn plan_ticks(series: &Series) -> Vec<i64> {
    let stride = tick_stride(series.len());
    series
        .samples
        .iter()
        .step_by(stride)
        .map(|s| s.timestamp)
        .collect()
}

/// Formats ticks as `HH:MM` for windows up to a day, `MM-DD HH:MM` beyond that.
pub fn label_ticks(ticks: &[i64], range: &TimeRange, offset: FixedOffset) -> Vec<AxisTick> {
    let format = if range.duration_ms() <= 24 * HOUR_MS {
        "%H:%M"
    } else {
        "%m-%d %H:%M"
    };

    ticks
        .iter()
        .filter_map(|&timestamp| {
            let local = DateTime::from_timestamp_millis(timestamp)?.with_timezone(&offset);
            Some(AxisTick {
                timestamp,
                label: local.format(format).to_string(),
            })
        })
        .collect()
}

/// `declared` is the configured unit for the key, used when no rule matches it.
pub fn annotate(
    series: &Series,
    range: &TimeRange,
    offset: FixedOffset,
    declared: Option<&str>,
) -> ChartAnnotation {
    ChartAnnotation {
        key: series.key.clone(),
        unit: detect_unit(&series.key, declared),
        ticks: label_ticks(&plan_ticks(series), range, offset),
    }
}
