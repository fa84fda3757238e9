// Time window resolution
use super::error::ValidationError;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Result<Self, ValidationError> {
        if start < 0 || end <= start {
            return Err(ValidationError::EmptyRange);
        }
        Ok(Self { start, end })
    }

    /// Rolling window ending at `now`.
    pub fn last_hours(now_ms: i64, hours: u32) -> Result<Self, ValidationError> {
        if hours == 0 {
            return Err(ValidationError::NonPositiveHours);
        }
        Self::new(now_ms - i64::from(hours) * HOUR_MS, now_ms)
    }

    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

/// What the user picked: a rolling window, explicit calendar dates, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSelection {
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RangeSelection {
    pub fn hours(hours: u32) -> Self {
        Self {
            hours: Some(hours),
            ..Self::default()
        }
    }

    /// Rolling selections move with the clock and are recomputed on every fetch.
    pub fn is_rolling(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Resolves a selection into concrete bounds. Explicit dates win over `hours`;
/// dates are interpreted as calendar days in `offset`.
pub fn resolve(
    selection: &RangeSelection,
    now_ms: i64,
    default_hours: u32,
    offset: FixedOffset,
) -> Result<TimeRange, ValidationError> {
    match (selection.start_date, selection.end_date) {
        (Some(start_date), Some(end_date)) => {
            if end_date < start_date {
                return Err(ValidationError::InvertedDates {
                    start: start_date.to_string(),
                    end: end_date.to_string(),
                });
            }
            let start = start_of_day(start_date, offset);
            let end = start_of_day(end_date, offset) + DAY_MS - 1;
            TimeRange::new(start, end)
        }
        (None, None) => TimeRange::last_hours(now_ms, selection.hours.unwrap_or(default_hours)),
        _ => Err(ValidationError::IncompleteDates),
    }
}

/// Like [`resolve`], but falls back to the default rolling window and hands the
/// validation error back for reporting.
pub fn resolve_or_default(
    selection: &RangeSelection,
    now_ms: i64,
    default_hours: u32,
    offset: FixedOffset,
) -> (TimeRange, Option<ValidationError>) {
    match resolve(selection, now_ms, default_hours, offset) {
        Ok(range) => (range, None),
        Err(err) => {
            let fallback = TimeRange::last_hours(now_ms, default_hours.max(1))
                .unwrap_or(TimeRange { start: 0, end: now_ms.max(1) });
            (fallback, Some(err))
        }
    }
}

fn start_of_day(date: NaiveDate, offset: FixedOffset) -> i64 {
    let local_midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    local_midnight - i64::from(offset.local_minus_utc()) * 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::date_range;

    const NOW: i64 = 1_700_000_000_000;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rolling_window() {
        let range = resolve(&RangeSelection::hours(24), NOW, 6, utc()).unwrap();
        assert_eq!(range.start, 1_699_913_600_000);
        assert_eq!(range.end, 1_700_000_000_000);
    }

    #[test]
    fn test_default_hours_used_when_unset() {
        let range = resolve(&RangeSelection::default(), NOW, 6, utc()).unwrap();
        assert_eq!(range.duration_ms(), 6 * HOUR_MS);
    }

    #[test]
    fn test_explicit_dates_take_precedence() {
        let mut selection = date_range(date(2024, 3, 1), date(2024, 3, 2));
        selection.hours = Some(1);

        let range = resolve(&selection, NOW, 6, utc()).unwrap();
        assert_eq!(range.start, 1_709_251_200_000);
        assert_eq!(range.end, 1_709_251_200_000 + 2 * DAY_MS - 1);
    }

    #[test]
    fn test_single_day_covers_whole_day() {
        let selection = date_range(date(2024, 3, 1), date(2024, 3, 1));
        let range = resolve(&selection, NOW, 6, utc()).unwrap();
        assert_eq!(range.duration_ms(), DAY_MS - 1);
    }

    #[test]
    fn test_dates_respect_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let selection = date_range(date(2024, 3, 1), date(2024, 3, 1));
        let range = resolve(&selection, NOW, 6, plus_two).unwrap();
        assert_eq!(range.start, 1_709_251_200_000 - 2 * HOUR_MS);
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let selection = date_range(date(2024, 3, 2), date(2024, 3, 1));
        let err = resolve(&selection, NOW, 6, utc()).unwrap_err();
        assert!(matches!(err, ValidationError::InvertedDates { .. }));
    }

    #[test]
    fn test_fallback_to_default_window() {
        let selection = date_range(date(2024, 3, 2), date(2024, 3, 1));
        let (range, err) = resolve_or_default(&selection, NOW, 24, utc());
        assert_eq!(range, TimeRange::new(1_699_913_600_000, NOW).unwrap());
        assert!(err.is_some());
    }

    #[test]
    fn test_incomplete_and_zero_hours() {
        let selection = RangeSelection {
            start_date: Some(date(2024, 3, 1)),
            ..RangeSelection::default()
        };
        assert_eq!(resolve(&selection, NOW, 6, utc()), Err(ValidationError::IncompleteDates));
        assert_eq!(
            resolve(&RangeSelection::hours(0), NOW, 6, utc()),
            Err(ValidationError::NonPositiveHours)
        );
    }

    #[test]
    fn test_explicit_bounds() {
        for (start, end) in [(0, 1), (100, 5_000), (NOW - 1, NOW)] {
            assert_eq!(TimeRange::new(start, end).unwrap(), TimeRange { start, end });
        }
        assert_eq!(TimeRange::new(10, 10), Err(ValidationError::EmptyRange));
        assert_eq!(TimeRange::new(10, 5), Err(ValidationError::EmptyRange));
    }
}
