use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CourseError;
use crate::weather::HourlyForecast;

/// Tolerance used when comparing course distances
const DISTANCE_EPSILON: f64 = 1e-9;

/// Named distance marker on a race course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Display name, e.g. "Mandela Bridge 84.2km"
    pub name: String,

    /// Cumulative distance from the race start in kilometers
    pub distance: f64,

    /// Multiplier applied to the base average speed (>1 faster, <1 slower)
    pub terrain_factor: f64,

    /// Short description of the terrain leading into this checkpoint
    pub description: String,
}

/// Course-specific finish time thresholds used for pace judgments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceThresholds {
    /// Anything faster is only achievable by elite professionals
    pub min_minutes: f64,

    /// Typical finish time of the front of the race
    pub elite_minutes: f64,

    /// Beginners targeting a faster finish get a warning
    pub beginner_warning_minutes: f64,
}

/// Immutable definition of a fixed-route race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceCourse {
    /// Registry identifier, e.g. "947-joburg"
    pub id: String,

    /// Full race name
    pub name: String,

    /// Abbreviated name used in tables
    pub short_name: String,

    /// Total race distance in kilometers
    pub total_distance: f64,

    /// City and country, passed to the weather provider
    pub location: String,

    /// Month the race is held, passed to the weather provider
    pub month: String,

    /// Default start time in HH:MM format
    pub default_start_time: String,

    /// Checkpoints ordered by strictly increasing distance
    pub checkpoints: Vec<Checkpoint>,

    /// Finish time thresholds for pace validation
    pub pace_validation: PaceThresholds,

    /// Checkpoints that end with a major climb
    #[serde(default)]
    pub hill_warning_checkpoints: Vec<String>,

    /// File name prefix for exported splits
    pub csv_filename_prefix: String,

    /// One-line race tip shown with every plan
    #[serde(default)]
    pub info_banner: String,
}

impl RaceCourse {
    /// Whether the named checkpoint is flagged as a hill warning point
    pub fn is_hill_warning(&self, checkpoint_name: &str) -> bool {
        self.hill_warning_checkpoints
            .iter()
            .any(|name| name == checkpoint_name)
    }

    /// Check the checkpoint invariants the split calculation relies on
    pub fn validate(&self) -> Result<(), CourseError> {
        let invalid = |reason: String| CourseError::InvalidCourse {
            id: self.id.clone(),
            reason,
        };

        if self.checkpoints.len() < 2 {
            return Err(invalid(format!(
                "at least 2 checkpoints required, found {}",
                self.checkpoints.len()
            )));
        }

        if !(self.total_distance.is_finite() && self.total_distance > 0.0) {
            return Err(invalid(format!(
                "total distance must be positive, got {}",
                self.total_distance
            )));
        }

        let mut previous = 0.0;
        for checkpoint in &self.checkpoints {
            if !(checkpoint.distance.is_finite() && checkpoint.distance > previous) {
                return Err(invalid(format!(
                    "checkpoint '{}' at {} km does not follow {} km",
                    checkpoint.name, checkpoint.distance, previous
                )));
            }
            if !(checkpoint.terrain_factor.is_finite() && checkpoint.terrain_factor > 0.0) {
                return Err(invalid(format!(
                    "checkpoint '{}' has non-positive terrain factor {}",
                    checkpoint.name, checkpoint.terrain_factor
                )));
            }
            previous = checkpoint.distance;
        }

        if (previous - self.total_distance).abs() > DISTANCE_EPSILON {
            return Err(invalid(format!(
                "last checkpoint at {} km does not match total distance {} km",
                previous, self.total_distance
            )));
        }

        for name in &self.hill_warning_checkpoints {
            if !self.checkpoints.iter().any(|c| &c.name == name) {
                return Err(invalid(format!(
                    "hill warning refers to unknown checkpoint '{}'",
                    name
                )));
            }
        }

        let thresholds = &self.pace_validation;
        if !(thresholds.min_minutes > 0.0 && thresholds.min_minutes <= thresholds.elite_minutes) {
            return Err(invalid(format!(
                "pace thresholds must satisfy 0 < min ({}) <= elite ({})",
                thresholds.min_minutes, thresholds.elite_minutes
            )));
        }

        Ok(())
    }
}

/// Qualitative terrain class derived from a terrain factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainDifficulty {
    Fast,
    Moderate,
    Challenging,
}

/// Lower bounds evaluated top-down; the first bound the factor reaches wins
const TERRAIN_BANDS: &[(f64, TerrainDifficulty)] = &[
    (1.2, TerrainDifficulty::Fast),
    (0.8, TerrainDifficulty::Moderate),
    (f64::NEG_INFINITY, TerrainDifficulty::Challenging),
];

impl TerrainDifficulty {
    /// Classify a terrain factor
    pub fn from_factor(terrain_factor: f64) -> Self {
        TERRAIN_BANDS
            .iter()
            .find(|(lower_bound, _)| terrain_factor >= *lower_bound)
            .map(|(_, difficulty)| *difficulty)
            .unwrap_or(TerrainDifficulty::Challenging)
    }

    /// Legend text for this class
    pub fn legend(&self) -> &'static str {
        match self {
            TerrainDifficulty::Fast => "Fast Section (Downhill/Flat)",
            TerrainDifficulty::Moderate => "Moderate Terrain",
            TerrainDifficulty::Challenging => "Challenging Hills",
        }
    }
}

/// Computed performance record for the segment ending at a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Name of the checkpoint that ends this segment
    pub checkpoint_name: String,

    /// Cumulative distance at the checkpoint in kilometers
    pub distance: f64,

    /// Segment length since the previous checkpoint in kilometers
    pub split_distance: f64,

    /// Normalized time spent on this segment in minutes
    pub split_time_minutes: f64,

    /// Race-elapsed minutes at the checkpoint
    pub cumulative_time_minutes: f64,

    /// Wall-clock arrival time (HH:MM)
    pub time_of_day: String,

    /// Average speed on this segment in km/h
    pub speed_on_split: f64,

    /// Cumulative distance divided by cumulative time, in km/h
    pub moving_average_speed: f64,

    /// Terrain factor of the checkpoint
    pub terrain_factor: f64,

    /// Terrain description of the checkpoint
    pub description: String,

    /// Nutrition events falling inside this segment
    pub nutrition_events: Vec<NutritionEvent>,

    /// Forecast for the arrival hour, when one was available
    pub weather: Option<HourlyForecast>,
}

impl Split {
    pub fn difficulty(&self) -> TerrainDifficulty {
        TerrainDifficulty::from_factor(self.terrain_factor)
    }
}

/// Nutrition event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutritionEventKind {
    Fuel,
    Hydration,
}

impl fmt::Display for NutritionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NutritionEventKind::Fuel => write!(f, "Fuel"),
            NutritionEventKind::Hydration => write!(f, "Hydration"),
        }
    }
}

/// Timed fuel or hydration instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEvent {
    /// Race-elapsed minutes
    pub time_minutes: f64,

    /// Wall-clock time (HH:MM)
    pub time_of_day: String,

    /// Fuel or hydration
    pub kind: NutritionEventKind,

    /// Human-readable instruction
    pub details: String,

    /// Interpolated race distance in kilometers
    pub distance: f64,

    /// Checkpoint that ends the enclosing split
    pub associated_checkpoint_name: String,

    /// True when a hill warning checkpoint is less than 15 minutes away
    pub is_pre_hill_warning: bool,
}

/// Severity of a pace judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgmentLevel {
    Error,
    Warning,
    Info,
    Success,
}

/// Qualitative classification of a target finish time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceJudgment {
    pub level: JudgmentLevel,
    pub title: String,
    pub message: String,
}

/// Coarse rider skill category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiderProfile {
    Beginner,
    #[default]
    Intermediate,
    Pro,
}

impl FromStr for RiderProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(RiderProfile::Beginner),
            "intermediate" => Ok(RiderProfile::Intermediate),
            "pro" | "professional" => Ok(RiderProfile::Pro),
            _ => Err(format!("Invalid rider profile: {}", s)),
        }
    }
}

impl fmt::Display for RiderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiderProfile::Beginner => write!(f, "beginner"),
            RiderProfile::Intermediate => write!(f, "intermediate"),
            RiderProfile::Pro => write!(f, "pro"),
        }
    }
}

/// Named fueling preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NutritionStrategy {
    Aggressive,
    #[default]
    Standard,
    Conservative,
    None,
}

impl FromStr for NutritionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aggressive" => Ok(NutritionStrategy::Aggressive),
            "standard" => Ok(NutritionStrategy::Standard),
            "conservative" => Ok(NutritionStrategy::Conservative),
            "none" | "off" => Ok(NutritionStrategy::None),
            _ => Err(format!("Invalid nutrition strategy: {}", s)),
        }
    }
}

impl fmt::Display for NutritionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NutritionStrategy::Aggressive => write!(f, "aggressive"),
            NutritionStrategy::Standard => write!(f, "standard"),
            NutritionStrategy::Conservative => write!(f, "conservative"),
            NutritionStrategy::None => write!(f, "none"),
        }
    }
}

/// Complete result of one planning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacePlan {
    /// Course identifier
    pub course_id: String,

    /// Full course name
    pub course_name: String,

    /// Course file name prefix for exports
    pub csv_filename_prefix: String,

    /// Race tip for this course
    pub info_banner: String,

    /// Target finish time in minutes
    pub target_total_minutes: f64,

    /// Start time used for wall-clock times (HH:MM)
    pub start_time: String,

    /// Total distance divided by target time, in km/h
    pub overall_average_speed: f64,

    /// Rider profile used for the pace judgment
    pub rider_profile: RiderProfile,

    /// Nutrition strategy used for the event schedule
    pub nutrition_strategy: NutritionStrategy,

    /// Normalized, annotated splits
    pub splits: Vec<Split>,

    /// All nutrition events in time order
    pub nutrition_events: Vec<NutritionEvent>,

    /// Classification of the target time
    pub pace_judgment: PaceJudgment,

    /// Whether a forecast was available for correlation
    pub weather_available: bool,
}

impl RacePlan {
    /// Target expressed as whole hours and remaining minutes
    pub fn target_hours_minutes(&self) -> (u32, u32) {
        let total = self.target_total_minutes.round().max(0.0) as u32;
        (total / 60, total % 60)
    }
}
