use std::str::FromStr;
use tempfile::tempdir;

use ridewise::export::{self, csv::HEADERS, ExportFormat};
use ridewise::time_of_day::parse_start_time;
use ridewise::{compute_plan, CourseRegistry, NutritionStrategy, RacePlan, RiderProfile};

fn plan(course_id: &str, target: f64, strategy: NutritionStrategy) -> RacePlan {
    let registry = CourseRegistry::builtin();
    let course = registry.get(course_id).unwrap();
    compute_plan(
        course,
        target,
        parse_start_time(&course.default_start_time).unwrap(),
        RiderProfile::Intermediate,
        strategy,
        None,
    )
    .unwrap()
    .unwrap()
}

#[test]
fn test_default_file_names() {
    let joburg = plan("947-joburg", 225.0, NutritionStrategy::Standard);
    assert_eq!(
        export::default_file_name(&joburg, ExportFormat::Csv),
        "947_ride_joburg_splits_3h45m.csv"
    );

    let ctct = plan("ctct", 300.0, NutritionStrategy::Standard);
    assert_eq!(
        export::default_file_name(&ctct, ExportFormat::Json),
        "ctct_109km_splits_5h0m.json"
    );
    assert_eq!(
        export::default_file_name(&ctct, ExportFormat::Text),
        "ctct_109km_splits_5h0m.txt"
    );
}

#[test]
fn test_export_to_dir_writes_every_format() {
    let dir = tempdir().unwrap();
    let plan = plan("ctct", 270.0, NutritionStrategy::Aggressive);

    for name in ["csv", "json", "text"] {
        let format = ExportFormat::from_str(name).unwrap();
        let path = export::export_plan_to_dir(&plan, format, dir.path().join("plans")).unwrap();

        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), format.extension());
    }
}

#[test]
fn test_csv_sheet_layout() {
    let dir = tempdir().unwrap();
    let plan = plan("ctct", 270.0, NutritionStrategy::Standard);
    let path = export::export_plan_to_dir(&plan, ExportFormat::Csv, dir.path()).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>());

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), plan.splits.len() + plan.nutrition_events.len());

    let checkpoint_rows: Vec<&csv::StringRecord> = records
        .iter()
        .filter(|r| !r[3].is_empty())
        .collect();
    assert_eq!(checkpoint_rows.len(), 9);

    let finish = checkpoint_rows.last().unwrap();
    assert_eq!(&finish[0], "Finish Green Point 109km");
    assert_eq!(&finish[1], "109.0");
    assert_eq!(&finish[2], "04:30:00");
    assert_eq!(&finish[7], "11:00");

    // Event rows only fill time, distance and description columns
    let event = records.iter().find(|r| r[9].starts_with("Hydration:")).unwrap();
    for column in [0, 3, 4, 5, 6, 7, 8] {
        assert!(event[column].is_empty(), "column {} should be blank", column);
    }
    assert_eq!(&event[2], "00:10:00");
}

#[test]
fn test_json_export_parses_back() {
    let dir = tempdir().unwrap();
    let plan = plan("947-joburg", 240.0, NutritionStrategy::Conservative);
    let path = export::export_plan_to_dir(&plan, ExportFormat::Json, dir.path()).unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let parsed: RacePlan = serde_json::from_str(&content).unwrap();

    assert_eq!(parsed.course_id, "947-joburg");
    assert_eq!(parsed.nutrition_events.len(), plan.nutrition_events.len());
    assert_eq!(parsed.target_hours_minutes(), (4, 0));
}
