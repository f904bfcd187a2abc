//! Unified error hierarchy for RideWise
//!
//! Provides the error types raised by course lookup, forecast fetching and
//! plan export, with severity mapping into the tracing system.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for all RideWise operations
#[derive(Debug, Error)]
pub enum RideWiseError {
    /// Race course lookup and validation errors
    #[error("Course error: {0}")]
    Course(#[from] CourseError),

    /// Weather forecast provider errors
    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),

    /// Plan export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid planning input (start time, profile names, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Race course registry errors
#[derive(Debug, Error)]
pub enum CourseError {
    /// No course registered under the requested identifier
    #[error("Race configuration not found for id: {id}")]
    ConfigurationNotFound { id: String },

    /// Course definition violates the checkpoint invariants
    #[error("Invalid course '{id}': {reason}")]
    InvalidCourse { id: String, reason: String },

    /// Course file could not be parsed
    #[error("Failed to parse course file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Weather forecast provider errors
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Provider reported a failure
    #[error("Forecast provider failed: {reason}")]
    Provider { reason: String },

    /// Provider did not answer in time
    #[error("Forecast request timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Plan export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Unsupported output format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// IO error while writing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for RideWise operations
pub type Result<T> = std::result::Result<T, RideWiseError>;

impl RideWiseError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RideWiseError::Weather(WeatherError::Timeout { .. })
                | RideWiseError::Weather(WeatherError::Provider { .. })
                | RideWiseError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RideWiseError::Weather(_) => ErrorSeverity::Warning,
            RideWiseError::Validation(_) => ErrorSeverity::Warning,
            RideWiseError::Course(CourseError::ConfigurationNotFound { .. }) => ErrorSeverity::Error,
            RideWiseError::Course(CourseError::InvalidCourse { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RideWiseError::Course(CourseError::ConfigurationNotFound { id }) => {
                format!(
                    "Unknown race '{}'. Run `ridewise courses` to see the available races.",
                    id
                )
            }
            RideWiseError::Weather(WeatherError::Timeout { .. }) => {
                "The weather forecast took too long to arrive. Try again or plan without weather."
                    .to_string()
            }
            RideWiseError::Validation(reason) => format!("Please check your input: {}", reason),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Broken configuration that needs fixing before planning can work
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = RideWiseError::Course(CourseError::ConfigurationNotFound {
            id: "tour-de-nowhere".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Error);

        let err = RideWiseError::Weather(WeatherError::Provider {
            reason: "offline".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_error_retryable() {
        let err = RideWiseError::Weather(WeatherError::Timeout {
            timeout: Duration::from_secs(10),
        });
        assert!(err.is_retryable());

        let err = RideWiseError::Course(CourseError::ConfigurationNotFound {
            id: "x".to_string(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = RideWiseError::Course(CourseError::ConfigurationNotFound {
            id: "ctc".to_string(),
        });
        assert!(err.user_message().contains("Unknown race 'ctc'"));
        assert!(err.to_string().contains("Race configuration not found for id: ctc"));
    }
}
