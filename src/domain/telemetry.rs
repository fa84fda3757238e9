// Telemetry data domain models
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single reading. Numeric and textual readings never mix within one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl SampleValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SampleValue::Number(n) => Some(*n),
            SampleValue::Text(_) => None,
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Number(n) => write!(f, "{}", n),
            SampleValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub value: SampleValue,
}

impl Sample {
    pub fn new(timestamp: i64, value: SampleValue) -> Self {
        Self { timestamp, value }
    }

    pub fn number(timestamp: i64, value: f64) -> Self {
        Self::new(timestamp, SampleValue::Number(value))
    }

    pub fn text(timestamp: i64, value: impl Into<String>) -> Self {
        Self::new(timestamp, SampleValue::Text(value.into()))
    }
}

/// Samples of one telemetry key in ascending timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(key: String, samples: Vec<Sample>) -> Self {
        Self { key, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Series keyed by telemetry key, in the order the backend reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeriesSet {
    series: Vec<Series>,
}

impl SeriesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series, replacing any existing series with the same key in place.
    pub fn insert(&mut self, series: Series) {
        match self.series.iter_mut().find(|s| s.key == series.key) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when no key holds any sample.
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(Series::is_empty)
    }

    pub fn sample_count(&self) -> usize {
        self.series.iter().map(Series::len).sum()
    }
}

impl FromIterator<Series> for SeriesSet {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        let mut set = SeriesSet::new();
        for series in iter {
            set.insert(series);
        }
        set
    }
}

impl IntoIterator for SeriesSet {
    type Item = Series;
    type IntoIter = std::vec::IntoIter<Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}

/// A sample exactly as the backend sent it; coerced by the normalizer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSample {
    #[serde(alias = "ts")]
    pub timestamp: i64,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub key: String,
    pub samples: Vec<RawSample>,
}

/// Backend response, one entry per key in response order.
pub type RawSeriesSet = Vec<RawSeries>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sample_accepts_ts_alias() {
        let sample: RawSample = serde_json::from_str(r#"{"ts": 100, "value": "20.5"}"#).unwrap();
        assert_eq!(sample.timestamp, 100);
        assert_eq!(sample.value, serde_json::json!("20.5"));
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut set = SeriesSet::new();
        set.insert(Series::new("voltage".into(), vec![Sample::number(1, 230.0)]));
        set.insert(Series::new("current".into(), vec![Sample::number(1, 2.0)]));
        set.insert(Series::new("voltage".into(), vec![Sample::number(2, 231.0)]));

        let keys: Vec<&str> = set.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["voltage", "current"]);
        assert_eq!(set.get("voltage").unwrap().samples[0].timestamp, 2);
        assert_eq!(set.sample_count(), 2);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(SampleValue::Number(20.0).to_string(), "20");
        assert_eq!(SampleValue::Number(20.5).to_string(), "20.5");
        assert_eq!(SampleValue::Text("ON".into()).to_string(), "ON");
    }

    #[test]
    fn test_empty_set_with_empty_series() {
        let set: SeriesSet = vec![Series::new("temperature".into(), vec![])].into_iter().collect();
        assert!(set.is_empty());
        assert_eq!(set.len(), 1);
    }
}
