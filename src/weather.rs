//! Hourly weather forecasts and their correlation with split arrival times
//!
//! The forecast itself comes from an external provider behind the async
//! [`WeatherProvider`] trait. This module only defines that boundary, two
//! simple providers (in-memory and JSON file) and the correlation step that
//! attaches the forecast for each split's arrival hour.

use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

use crate::error::WeatherError;
use crate::models::{RaceCourse, Split};
use crate::time_of_day::{clock_time, hour_key};

/// Forecast for a single hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyForecast {
    /// Hour in HH:00 format
    pub time: String,

    /// Temperature in Celsius
    pub temperature: f64,

    /// Wind speed in km/h
    pub wind_speed: f64,

    /// Compass wind direction, e.g. "SW"
    pub wind_direction: String,

    /// Short condition description, e.g. "Partly Cloudy"
    pub condition: String,

    /// Material Symbols icon name, e.g. "partly_cloudy_day"
    pub icon: String,
}

/// Hourly forecast covering a race
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub hourly: Vec<HourlyForecast>,
}

impl WeatherForecast {
    /// Drop entries whose time is not an HH:00 hour key, returning them
    ///
    /// Such entries can never match an arrival hour; the rest of the
    /// forecast stays usable.
    pub fn discard_malformed(&mut self) -> Vec<HourlyForecast> {
        let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(&mut self.hourly)
            .into_iter()
            .partition(|entry| is_hour_key(&entry.time));
        self.hourly = kept;
        dropped
    }
}

fn is_hour_key(time: &str) -> bool {
    time.len() == 5
        && NaiveTime::parse_from_str(time, "%H:%M")
            .map(|time| time.minute() == 0)
            .unwrap_or(false)
}

/// Parameters handed to a forecast provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRequest {
    /// City and country
    pub location: String,

    /// Month the race takes place
    pub month: String,

    /// Race start time (HH:MM)
    pub start_time: String,

    /// Approximate race duration in hours
    pub duration_hours: f64,
}

impl WeatherRequest {
    pub fn for_course(course: &RaceCourse, start_time: NaiveTime, target_total_minutes: f64) -> Self {
        WeatherRequest {
            location: course.location.clone(),
            month: course.month.clone(),
            start_time: start_time.format("%H:%M").to_string(),
            duration_hours: target_total_minutes / 60.0,
        }
    }

    /// Hour keys of the forecast window: one hour before the start until one
    /// hour after the expected finish
    pub fn hour_keys(&self) -> Vec<String> {
        let Ok(start) = NaiveTime::parse_from_str(&self.start_time, "%H:%M") else {
            return Vec::new();
        };
        let finish_minutes = (self.duration_hours.max(0.0) * 60.0).ceil();
        let mut keys: Vec<String> = Vec::new();

        let mut offset = -60.0;
        while offset <= finish_minutes + 60.0 {
            let key = clock_time(start, offset).format("%H:00").to_string();
            if !keys.contains(&key) {
                keys.push(key);
            }
            offset += 60.0;
        }

        // The last step can land on a later minute of the same hour as the
        // previous key; make sure the hour containing finish + 1h is present.
        let last = clock_time(start, finish_minutes + 60.0).format("%H:00").to_string();
        if !keys.contains(&last) {
            keys.push(last);
        }
        keys
    }
}

/// Source of hourly race-day forecasts
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the hourly forecast for a race
    async fn forecast(&self, request: &WeatherRequest) -> Result<WeatherForecast, WeatherError>;
}

/// Provider that always answers with the same forecast
#[derive(Debug, Clone)]
pub struct StaticForecastProvider {
    forecast: WeatherForecast,
}

impl StaticForecastProvider {
    pub fn new(forecast: WeatherForecast) -> Self {
        Self { forecast }
    }
}

#[async_trait]
impl WeatherProvider for StaticForecastProvider {
    async fn forecast(&self, _request: &WeatherRequest) -> Result<WeatherForecast, WeatherError> {
        Ok(self.forecast.clone())
    }
}

/// Provider reading a forecast in the hourly JSON schema from disk
///
/// Entries outside the request's window are dropped.
#[derive(Debug, Clone)]
pub struct JsonForecastProvider {
    path: PathBuf,
}

impl JsonForecastProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WeatherProvider for JsonForecastProvider {
    async fn forecast(&self, request: &WeatherRequest) -> Result<WeatherForecast, WeatherError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| WeatherError::Provider {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let forecast: WeatherForecast =
            serde_json::from_str(&content).map_err(|e| WeatherError::Provider {
                reason: format!("failed to parse {}: {}", self.path.display(), e),
            })?;

        // Window keys are all HH:00, so malformed entries fall out here too
        let window = request.hour_keys();
        let hourly: Vec<HourlyForecast> = forecast
            .hourly
            .into_iter()
            .filter(|entry| window.contains(&entry.time))
            .collect();

        debug!(path = %self.path.display(), entries = hourly.len(), "Loaded forecast file");
        Ok(WeatherForecast { hourly })
    }
}

/// Attaches forecast entries to splits by arrival hour
pub struct WeatherCorrelator<'a> {
    by_hour: HashMap<&'a str, &'a HourlyForecast>,
}

impl<'a> WeatherCorrelator<'a> {
    pub fn new(forecast: &'a WeatherForecast) -> Self {
        let mut by_hour = HashMap::new();
        for entry in &forecast.hourly {
            // First entry wins when a provider repeats an hour
            by_hour.entry(entry.time.as_str()).or_insert(entry);
        }
        Self { by_hour }
    }

    /// Forecast for a wall-clock "HH:MM" arrival time
    pub fn lookup(&self, time_of_day: &str) -> Option<&'a HourlyForecast> {
        let key = hour_key(time_of_day)?;
        self.by_hour.get(key.as_str()).copied()
    }

    /// Return the splits with the arrival-hour forecast attached
    ///
    /// Splits whose hour has no entry keep `weather` unset.
    pub fn correlate(&self, splits: Vec<Split>) -> Vec<Split> {
        splits
            .into_iter()
            .map(|split| {
                let weather = self.lookup(&split.time_of_day).cloned();
                Split { weather, ..split }
            })
            .collect()
    }
}
