use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use super::ExportError;
use crate::models::{NutritionEvent, RacePlan, Split};
use crate::time_of_day::format_duration;
use crate::weather::HourlyForecast;

/// Column headers of the splits sheet
pub const HEADERS: [&str; 10] = [
    "Point on Route",
    "Distance (km)",
    "Time to Point",
    "Split Time",
    "Split Distance (km)",
    "Speed on Split (km/h)",
    "Moving Average Speed (km/h)",
    "Time of Day",
    "Weather",
    "Terrain Description",
];

type Row = [String; 10];

/// Flatten a plan into sheet rows
///
/// Each split row is followed by the rows of its nutrition events. Event
/// rows only fill the distance, time and description columns. A row
/// identical to one already emitted is skipped.
pub fn plan_rows(plan: &RacePlan) -> Vec<Row> {
    let mut seen: HashSet<Row> = HashSet::new();
    let mut rows = Vec::new();

    for split in &plan.splits {
        let candidates = std::iter::once(split_row(split))
            .chain(split.nutrition_events.iter().map(event_row));
        for row in candidates {
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
    }
    rows
}

fn split_row(split: &Split) -> Row {
    [
        split.checkpoint_name.clone(),
        format!("{:.1}", split.distance),
        format_duration(split.cumulative_time_minutes),
        format_duration(split.split_time_minutes),
        format!("{:.1}", split.split_distance),
        format!("{:.2}", split.speed_on_split),
        format!("{:.2}", split.moving_average_speed),
        split.time_of_day.clone(),
        split.weather.as_ref().map(weather_summary).unwrap_or_default(),
        split.description.clone(),
    ]
}

fn event_row(event: &NutritionEvent) -> Row {
    let details = if event.is_pre_hill_warning {
        format!("{} (before climb)", event.details)
    } else {
        event.details.clone()
    };

    [
        String::new(),
        format!("{:.1}", event.distance),
        format_duration(event.time_minutes),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        details,
    ]
}

/// One-line weather summary, e.g. "Sunny 18°C, wind 12 km/h NW"
pub fn weather_summary(forecast: &HourlyForecast) -> String {
    format!(
        "{} {:.0}°C, wind {:.0} km/h {}",
        forecast.condition, forecast.temperature, forecast.wind_speed, forecast.wind_direction
    )
}

/// Write the splits sheet to any writer
pub fn write_plan<W: Write>(plan: &RacePlan, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = ::csv::Writer::from_writer(writer);

    csv_writer.write_record(HEADERS)?;
    for row in plan_rows(plan) {
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Export the splits sheet to a CSV file
pub fn export_plan<P: AsRef<Path>>(plan: &RacePlan, output_path: P) -> Result<(), ExportError> {
    let file = std::fs::File::create(output_path)?;
    write_plan(plan, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::CourseRegistry;
    use crate::models::{NutritionEventKind, NutritionStrategy, RiderProfile};
    use crate::planner::compute_plan;
    use crate::time_of_day::parse_start_time;
    use tempfile::NamedTempFile;

    fn joburg_plan(strategy: NutritionStrategy) -> RacePlan {
        let registry = CourseRegistry::builtin();
        compute_plan(
            registry.get("947-joburg").unwrap(),
            225.0,
            parse_start_time("06:00").unwrap(),
            RiderProfile::Intermediate,
            strategy,
            None,
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_split_rows_without_nutrition() {
        let plan = joburg_plan(NutritionStrategy::None);
        let rows = plan_rows(&plan);

        assert_eq!(rows.len(), 5);
        let last = rows.last().unwrap();
        assert_eq!(last[0], "Finish 98km");
        assert_eq!(last[1], "98.0");
        assert_eq!(last[2], "03:45:00");
        assert_eq!(last[6], "26.13");
        assert_eq!(last[7], "09:45");
        assert_eq!(last[8], "");
    }

    #[test]
    fn test_event_rows_follow_their_split() {
        let plan = joburg_plan(NutritionStrategy::Standard);
        let rows = plan_rows(&plan);

        assert_eq!(rows.len(), 5 + plan.nutrition_events.len());
        assert_eq!(rows[0][0], "M1 17km");
        assert_eq!(rows[1][2], "00:10:00");
        assert!(rows[1][9].starts_with("Hydration:"));
        assert!(rows[2][9].starts_with("Fuel:"));
        assert!(rows[2][9].contains("30g"));

        // Only distance, time and description are filled on event rows
        for row in &rows[1..3] {
            let filled: Vec<usize> = (0..row.len()).filter(|&i| !row[i].is_empty()).collect();
            assert_eq!(filled, vec![1, 2, 9]);
        }
    }

    #[test]
    fn test_duplicate_rows_are_suppressed() {
        let mut plan = joburg_plan(NutritionStrategy::Standard);
        let duplicate = plan.splits[0].nutrition_events[0].clone();
        plan.splits[0].nutrition_events.push(duplicate);

        let rows = plan_rows(&plan);
        assert_eq!(rows.len(), 5 + plan.nutrition_events.len());
    }

    #[test]
    fn test_write_plan_quotes_descriptions() {
        let plan = joburg_plan(NutritionStrategy::Standard);
        let mut buffer = Vec::new();
        write_plan(&plan, &mut buffer).unwrap();

        let content = String::from_utf8(buffer).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Point on Route,Distance (km),Time to Point,Split Time,Split Distance (km),Speed on Split (km/h),Moving Average Speed (km/h),Time of Day,Weather,Terrain Description"
        );
        assert!(content.contains("\"Moderate start, mixed terrain\""));
    }

    #[test]
    fn test_export_plan_to_file() {
        let plan = joburg_plan(NutritionStrategy::Aggressive);
        let temp_file = NamedTempFile::new().unwrap();

        export_plan(&plan, temp_file.path()).unwrap();

        let mut reader = ::csv::Reader::from_path(temp_file.path()).unwrap();
        let records: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        let fuel_rows = records
            .iter()
            .filter(|r| r[0].is_empty() && r[9].starts_with("Fuel:"))
            .count();
        assert_eq!(
            fuel_rows,
            plan.nutrition_events
                .iter()
                .filter(|e| e.kind == NutritionEventKind::Fuel)
                .count()
        );
    }
}
