use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::ExportFormat;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::models::{NutritionStrategy, RiderProfile};
use crate::planner::{PlannerSettings, WeatherFailurePolicy};
use crate::time_of_day::parse_start_time;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Extra TOML course files loaded on top of the built-in races
    #[serde(default)]
    pub course_files: Vec<PathBuf>,

    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Planning defaults used when the command line leaves them out
    #[serde(default)]
    pub defaults: PlanDefaults,

    /// Forecast provider settings
    #[serde(default)]
    pub weather: WeatherSettings,

    /// Export preferences
    #[serde(default)]
    pub export: ExportSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Planning defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanDefaults {
    /// Race planned when no course is given
    pub course_id: String,

    pub rider_profile: RiderProfile,
    pub nutrition_strategy: NutritionStrategy,

    /// Start time override (HH:MM); the course default applies when unset
    pub start_time: Option<String>,
}

/// Forecast provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// Fetch a forecast for each plan
    pub enabled: bool,

    /// Hourly forecast JSON file used as the provider
    pub forecast_file: Option<PathBuf>,

    /// Upper bound on a forecast request in seconds
    pub timeout_secs: u64,

    /// Behaviour when the forecast cannot be fetched
    pub failure_policy: WeatherFailurePolicy,
}

/// Export preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory exported plans are written to
    pub output_dir: PathBuf,

    /// Default export format
    pub format: ExportFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            course_files: Vec::new(),
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            defaults: PlanDefaults::default(),
            weather: WeatherSettings::default(),
            export: ExportSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for PlanDefaults {
    fn default() -> Self {
        PlanDefaults {
            course_id: "947-joburg".to_string(),
            rider_profile: RiderProfile::default(),
            nutrition_strategy: NutritionStrategy::default(),
            start_time: None,
        }
    }
}

impl Default for WeatherSettings {
    fn default() -> Self {
        WeatherSettings {
            enabled: false,
            forecast_file: None,
            timeout_secs: 10,
            failure_policy: WeatherFailurePolicy::default(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            output_dir: PathBuf::from("."),
            format: ExportFormat::default(),
        }
    }
}

/// Keys accepted by [`AppConfig::get`] and [`AppConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "defaults.course_id",
    "defaults.rider_profile",
    "defaults.nutrition_strategy",
    "defaults.start_time",
    "weather.enabled",
    "weather.forecast_file",
    "weather.timeout_secs",
    "weather.failure_policy",
    "export.output_dir",
    "export.format",
    "logging.level",
    "logging.format",
    "logging.file_path",
];

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ridewise")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    ///
    /// A missing file silently yields the defaults; an unreadable one is
    /// reported on stderr first, since logging is not set up yet.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Forecast settings for the planner
    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            weather_timeout: Duration::from_secs(self.weather.timeout_secs),
            failure_policy: self.weather.failure_policy,
        }
    }

    /// Read a setting by dotted key, e.g. `weather.timeout_secs`
    pub fn get(&self, key: &str) -> Result<String> {
        let optional = |value: Option<String>| value.unwrap_or_default();

        let value = match key {
            "defaults.course_id" => self.defaults.course_id.clone(),
            "defaults.rider_profile" => self.defaults.rider_profile.to_string(),
            "defaults.nutrition_strategy" => self.defaults.nutrition_strategy.to_string(),
            "defaults.start_time" => optional(self.defaults.start_time.clone()),
            "weather.enabled" => self.weather.enabled.to_string(),
            "weather.forecast_file" => optional(
                self.weather
                    .forecast_file
                    .as_ref()
                    .map(|p| p.display().to_string()),
            ),
            "weather.timeout_secs" => self.weather.timeout_secs.to_string(),
            "weather.failure_policy" => self.weather.failure_policy.to_string(),
            "export.output_dir" => self.export.output_dir.display().to_string(),
            "export.format" => self.export.format.to_string(),
            "logging.level" => self.logging.level.to_string(),
            "logging.format" => self.logging.format.to_string(),
            "logging.file_path" => optional(
                self.logging
                    .file_path
                    .as_ref()
                    .map(|p| p.display().to_string()),
            ),
            _ => bail!("Unknown configuration key: {}", key),
        };
        Ok(value)
    }

    /// Update a setting by dotted key; an empty value clears optional settings
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional_path = |value: &str| (!value.is_empty()).then(|| PathBuf::from(value));

        match key {
            "defaults.course_id" => self.defaults.course_id = value.to_string(),
            "defaults.rider_profile" => {
                self.defaults.rider_profile = value.parse::<RiderProfile>().map_err(anyhow::Error::msg)?
            }
            "defaults.nutrition_strategy" => {
                self.defaults.nutrition_strategy =
                    value.parse::<NutritionStrategy>().map_err(anyhow::Error::msg)?
            }
            "defaults.start_time" => {
                self.defaults.start_time = if value.is_empty() {
                    None
                } else {
                    parse_start_time(value)?;
                    Some(value.to_string())
                }
            }
            "weather.enabled" => {
                self.weather.enabled = value
                    .parse::<bool>()
                    .with_context(|| format!("Expected true or false, got '{}'", value))?
            }
            "weather.forecast_file" => self.weather.forecast_file = optional_path(value),
            "weather.timeout_secs" => {
                self.weather.timeout_secs = value
                    .parse::<u64>()
                    .with_context(|| format!("Expected a number of seconds, got '{}'", value))?
            }
            "weather.failure_policy" => {
                self.weather.failure_policy =
                    value.parse::<WeatherFailurePolicy>().map_err(anyhow::Error::msg)?
            }
            "export.output_dir" => self.export.output_dir = PathBuf::from(value),
            "export.format" => self.export.format = value.parse::<ExportFormat>()?,
            "logging.level" => {
                self.logging.level = value.parse::<LogLevel>().map_err(anyhow::Error::msg)?
            }
            "logging.format" => {
                self.logging.format = value.parse::<LogFormat>().map_err(anyhow::Error::msg)?
            }
            "logging.file_path" => self.logging.file_path = optional_path(value),
            _ => bail!("Unknown configuration key: {}", key),
        }

        self.metadata.updated_at = Utc::now();
        Ok(())
    }
}
