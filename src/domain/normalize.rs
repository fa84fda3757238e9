// Series normalization: coercion, ordering and timestamp dedup
use super::telemetry::{RawSample, RawSeries, RawSeriesSet, Sample, SampleValue, Series, SeriesSet};
use super::time_range::TimeRange;
use serde_json::Value;

/// Turns a backend response into a clean [`SeriesSet`]. Never fails; samples
/// that cannot be placed on a time axis are dropped.
pub fn normalize(raw: RawSeriesSet) -> SeriesSet {
    raw.into_iter()
        .map(normalize_raw_series)
        .filter(|series| !series.is_empty())
        .collect()
}

fn normalize_raw_series(raw: RawSeries) -> Series {
    let usable: Vec<RawSample> = raw
        .samples
        .into_iter()
        .filter(|s| s.timestamp >= 0 && !s.value.is_null())
        .collect();

    let numeric = usable.iter().all(|s| parse_number(&s.value).is_some());

    let samples = usable
        .into_iter()
        .map(|s| match parse_number(&s.value) {
            Some(n) if numeric => Sample::number(s.timestamp, n),
            _ => Sample::text(s.timestamp, render_text(&s.value)),
        })
        .collect();

    Series::new(raw.key, normalize_samples(samples))
}

/// Stable sort by timestamp, then keep the last sample of every run of equal
/// timestamps. Idempotent.
pub fn normalize_samples(mut samples: Vec<Sample>) -> Vec<Sample> {
    samples.sort_by_key(|s| s.timestamp);

    let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match out.last_mut() {
            Some(last) if last.timestamp == sample.timestamp => *last = sample,
            _ => out.push(sample),
        }
    }
    out
}

/// Folds a latest-reading response into the current set. Each key's newest
/// sample is appended, or overwrites one at the same timestamp. If either side
/// holds text the merged series is text, as `normalize` would make it. With a
/// window, samples that fell out of it are trimmed.
pub fn merge_latest(current: &SeriesSet, latest: SeriesSet, window: Option<TimeRange>) -> SeriesSet {
    let mut merged = current.clone();

    for incoming in latest {
        let mut samples = merged
            .get(&incoming.key)
            .map(|s| s.samples.clone())
            .unwrap_or_default();

        samples.extend(incoming.samples);
        if samples.iter().any(|s| s.value.as_f64().is_none()) {
            samples = samples.into_iter().map(into_text).collect();
        }
        let mut samples = normalize_samples(samples);
        if let Some(window) = window {
            samples.retain(|s| s.timestamp >= window.start);
        }
        merged.insert(Series::new(incoming.key, samples));
    }

    merged
}

fn into_text(sample: Sample) -> Sample {
    match sample.value {
        SampleValue::Number(n) => Sample::text(sample.timestamp, SampleValue::Number(n).to_string()),
        SampleValue::Text(_) => sample,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => SampleValue::Number(f).to_string(),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}
