// Library interface for RideWise modules
// This allows integration tests and benchmarks to access the planning engine

pub mod config;
pub mod courses;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod nutrition;
pub mod pace;
pub mod planner;
pub mod splits;
pub mod time_of_day;
pub mod weather;

// Re-export commonly used types for convenience
pub use models::*;
pub use courses::CourseRegistry;
pub use error::{CourseError, ExportError, Result, RideWiseError, WeatherError};
pub use export::ExportFormat;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use nutrition::{NutritionScheduler, StrategyProfile};
pub use pace::PaceValidator;
pub use planner::{
    compute_plan, sweep, PlanRequest, PlanSession, PlannerSettings, PublishedPlan, RacePlanner,
    SubmitOutcome, SweepRow, WeatherFailurePolicy, MAX_TARGET_MINUTES,
};
pub use splits::SplitCalculator;
pub use weather::{
    HourlyForecast, JsonForecastProvider, StaticForecastProvider, WeatherCorrelator,
    WeatherForecast, WeatherProvider, WeatherRequest,
};
