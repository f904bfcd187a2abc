use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::models::RacePlan;

pub mod csv;
pub mod json;
pub mod text;

pub use crate::error::ExportError;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Text,
}

impl ExportFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Text => write!(f, "text"),
        }
    }
}

/// Default export file name: `{prefix}_{H}h{M}m.{ext}`
pub fn default_file_name(plan: &RacePlan, format: ExportFormat) -> String {
    let (hours, minutes) = plan.target_hours_minutes();
    format!(
        "{}_{}h{}m.{}",
        plan.csv_filename_prefix,
        hours,
        minutes,
        format.extension()
    )
}

/// Write a plan to `output_path` in the given format
pub fn export_plan<P: AsRef<Path>>(
    plan: &RacePlan,
    format: ExportFormat,
    output_path: P,
) -> Result<(), ExportError> {
    let output_path = output_path.as_ref();
    match format {
        ExportFormat::Csv => csv::export_plan(plan, output_path)?,
        ExportFormat::Json => json::export_plan(plan, output_path)?,
        ExportFormat::Text => text::export_plan(plan, output_path)?,
    }

    info!(path = %output_path.display(), format = %format, "Exported race plan");
    Ok(())
}

/// Write a plan into `output_dir` under its default file name
pub fn export_plan_to_dir<P: AsRef<Path>>(
    plan: &RacePlan,
    format: ExportFormat,
    output_dir: P,
) -> Result<PathBuf, ExportError> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(default_file_name(plan, format));
    export_plan(plan, format, &path)?;
    Ok(path)
}
