//! Wall-clock helpers shared by the split, nutrition and weather stages
//!
//! Race-elapsed minutes are fractional; every conversion rounds them to the
//! nearest whole second first so that values such as 224.9999999 minutes
//! render as 03:45:00 rather than 03:44:59.

use chrono::{Duration, NaiveTime, Timelike};

use crate::error::{Result, RideWiseError};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Parse a start time in HH:MM format
pub fn parse_start_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        RideWiseError::Validation(format!("start time '{}' is not HH:MM ({})", value, e))
    })
}

fn elapsed_seconds(elapsed_minutes: f64) -> i64 {
    if !elapsed_minutes.is_finite() {
        return 0;
    }
    (elapsed_minutes * 60.0).round() as i64
}

/// Clock time reached after `elapsed_minutes`, wrapping past midnight
pub fn clock_time(start: NaiveTime, elapsed_minutes: f64) -> NaiveTime {
    let offset = elapsed_seconds(elapsed_minutes).rem_euclid(SECONDS_PER_DAY);
    let (time, _wrapped_days) = start.overflowing_add_signed(Duration::seconds(offset));
    time
}

/// Wall-clock "HH:MM" string for a race-elapsed offset
pub fn time_of_day(start: NaiveTime, elapsed_minutes: f64) -> String {
    clock_time(start, elapsed_minutes).format("%H:%M").to_string()
}

/// Format a duration in minutes as HH:MM:SS (hours may exceed 23)
pub fn format_duration(total_minutes: f64) -> String {
    let total_seconds = elapsed_seconds(total_minutes).max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Forecast key ("HH:00") for a wall-clock "HH:MM" string, minutes discarded
pub fn hour_key(time_of_day: &str) -> Option<String> {
    NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M")
        .ok()
        .map(|time| format!("{:02}:00", time.hour()))
}
