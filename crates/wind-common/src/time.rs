//! Forecast time selection.
//!
//! Upstream timestamps are UTC hours without a zone suffix
//! (`YYYY-MM-DDTHH:MM`). The target time is the current UTC hour
//! (minutes truncated) plus the user's offset.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};

/// Parse an upstream UTC-hour timestamp.
pub fn parse_utc_hour(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// The forecast instant the user asked for: current hour + offset.
pub fn target_forecast_time(now: DateTime<Utc>, offset_hours: u32) -> DateTime<Utc> {
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + Duration::hours(offset_hours as i64)
}

/// Index of the series timestamp closest to the target. Unparseable
/// entries are skipped; an empty or fully unparseable list yields 0.
pub fn closest_time_index(times: &[String], target: DateTime<Utc>) -> usize {
    let mut best_index = 0;
    let mut best_diff = i64::MAX;

    for (index, value) in times.iter().enumerate() {
        let Some(candidate) = parse_utc_hour(value) else {
            continue;
        };
        let diff = (candidate - target).num_milliseconds().abs();
        if diff < best_diff {
            best_diff = diff;
            best_index = index;
        }
    }

    best_index
}

/// Human-readable forecast readout, e.g. `Forecast: Mon 14:00`.
pub fn forecast_readout(forecast_time: Option<DateTime<Utc>>) -> String {
    match forecast_time {
        Some(time) => format!("Forecast: {}", time.format("%a %H:%M")),
        None => "Forecast: Unavailable".to_string(),
    }
}
