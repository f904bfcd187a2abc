//! Race course registry
//!
//! Ships the built-in race definitions and loads additional courses from
//! TOML files. Every course is validated before it becomes available for
//! planning, so the split calculation never sees a malformed course.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::CourseError;
use crate::models::{Checkpoint, PaceThresholds, RaceCourse};

/// TOML layout of a course file: one `[[courses]]` table per race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseFile {
    #[serde(default)]
    pub courses: Vec<RaceCourse>,
}

/// Lookup table of validated race courses
#[derive(Debug, Clone, Default)]
pub struct CourseRegistry {
    courses: Vec<RaceCourse>,
}

impl CourseRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in races
    pub fn builtin() -> Self {
        CourseRegistry {
            courses: vec![joburg_947(), cape_town_cycle_tour()],
        }
    }

    /// Look up a course by identifier
    pub fn get(&self, id: &str) -> Result<&RaceCourse, CourseError> {
        self.courses
            .iter()
            .find(|course| course.id == id)
            .ok_or_else(|| CourseError::ConfigurationNotFound { id: id.to_string() })
    }

    /// Courses in registration order
    pub fn list(&self) -> &[RaceCourse] {
        &self.courses
    }

    /// Validate and add a course, replacing any course with the same id
    pub fn register(&mut self, course: RaceCourse) -> Result<(), CourseError> {
        course.validate()?;

        match self.courses.iter_mut().find(|existing| existing.id == course.id) {
            Some(existing) => {
                debug!(course = %course.id, "Replacing registered course");
                *existing = course;
            }
            None => self.courses.push(course),
        }
        Ok(())
    }

    /// Load every course from a TOML course file, returning how many were added
    ///
    /// The registry is left unchanged when any course in the file is invalid.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, CourseError> {
        let path = path.as_ref();
        let parse_error = |reason: String| CourseError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
        let file: CourseFile = toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;

        // All or nothing: one bad course keeps the whole file out
        file.courses.iter().try_for_each(RaceCourse::validate)?;

        let count = file.courses.len();
        for course in file.courses {
            self.register(course)?;
        }

        info!(path = %path.display(), count, "Loaded course file");
        Ok(count)
    }
}

fn checkpoint(name: &str, distance: f64, terrain_factor: f64, description: &str) -> Checkpoint {
    Checkpoint {
        name: name.to_string(),
        distance,
        terrain_factor,
        description: description.to_string(),
    }
}

fn joburg_947() -> RaceCourse {
    RaceCourse {
        id: "947-joburg".to_string(),
        name: "947 Ride Joburg".to_string(),
        short_name: "947".to_string(),
        total_distance: 98.0,
        location: "Johannesburg, South Africa".to_string(),
        month: "November".to_string(),
        default_start_time: "06:00".to_string(),
        checkpoints: vec![
            checkpoint("M1 17km", 17.0, 1.0, "Moderate start, mixed terrain"),
            checkpoint("Kyalami Entrance 44.2km", 44.2, 1.25, "Fast section - downhill/flat"),
            checkpoint("Kyalami Exit 49.3km", 49.3, 0.75, "Challenging hills - expect slowdown"),
            checkpoint("Mandela Bridge 84.2km", 84.2, 0.65, "Toughest section - major hills"),
            checkpoint("Finish 98km", 98.0, 0.85, "Final push - mixed terrain"),
        ],
        pace_validation: PaceThresholds {
            min_minutes: 150.0,
            elite_minutes: 180.0,
            beginner_warning_minutes: 240.0,
        },
        hill_warning_checkpoints: vec![
            "Kyalami Exit 49.3km".to_string(),
            "Mandela Bridge 84.2km".to_string(),
        ],
        csv_filename_prefix: "947_ride_joburg_splits".to_string(),
        info_banner: "Watch for Mandela Bridge at 84km - the race is won or lost there".to_string(),
    }
}

fn cape_town_cycle_tour() -> RaceCourse {
    RaceCourse {
        id: "ctct".to_string(),
        name: "Cape Town Cycle Tour".to_string(),
        short_name: "CTCT".to_string(),
        total_distance: 109.0,
        location: "Cape Town, South Africa".to_string(),
        month: "March".to_string(),
        default_start_time: "06:30".to_string(),
        checkpoints: vec![
            checkpoint(
                "Constantia 9.9km",
                9.9,
                0.94,
                "Rolling coastal start - expect peloton congestion, settle into your rhythm",
            ),
            checkpoint(
                "Simon's Town 20.8km",
                20.8,
                1.27,
                "Fast coastal section - includes steep climb then big descent to Simon's Town",
            ),
            checkpoint(
                "Klaas Jagersberg 37.9km",
                37.9,
                1.16,
                "Fast flat return leg - bank time here, the OKW climb is coming",
            ),
            checkpoint(
                "Perdekloof 51.2km",
                51.2,
                0.94,
                "Ou Kaapse Weg - 5km sustained climb at ~20 km/h, biggest challenge on the route",
            ),
            checkpoint(
                "Noordhoek 62km",
                62.0,
                1.18,
                "OKW descent into Noordhoek valley - fast recovery, let the legs spin out",
            ),
            checkpoint(
                "Hout Bay 70.1km",
                70.1,
                1.12,
                "Rolling coastal section into Hout Bay - manageable hills, stay fuelled",
            ),
            checkpoint(
                "Tokai 89km",
                89.0,
                1.03,
                "Mixed terrain - notable climb (+96m) followed by big descent (-149m), nets average pace",
            ),
            checkpoint(
                "Suikerbossie 95km",
                95.0,
                0.96,
                "Suikerbossie climb (+133m at 15 km/h) - the final major climb, give everything you have",
            ),
            checkpoint(
                "Finish Green Point 109km",
                109.0,
                1.08,
                "Fast descent then flat run into Cape Town city centre - empty the tank all the way to Green Point",
            ),
        ],
        pace_validation: PaceThresholds {
            min_minutes: 200.0,
            elite_minutes: 225.0,
            beginner_warning_minutes: 270.0,
        },
        hill_warning_checkpoints: vec![
            "Perdekloof 51.2km".to_string(),
            "Suikerbossie 95km".to_string(),
        ],
        csv_filename_prefix: "ctct_109km_splits".to_string(),
        info_banner:
            "Ou Kaapse Weg at 44-50km and Suikerbossie at 88-95km are the defining climbs"
                .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HILL_CLIMB_TOML: &str = r#"
[[courses]]
id = "hill-climb"
name = "Local Hill Climb"
short_name = "HC"
total_distance = 12.0
location = "Pretoria, South Africa"
month = "June"
default_start_time = "08:00"
hill_warning_checkpoints = ["Summit 12km"]
csv_filename_prefix = "hill_climb_splits"
info_banner = "Pace the lower slopes"

[courses.pace_validation]
min_minutes = 20.0
elite_minutes = 25.0
beginner_warning_minutes = 40.0

[[courses.checkpoints]]
name = "Base 4km"
distance = 4.0
terrain_factor = 1.1
description = "Flat approach"

[[courses.checkpoints]]
name = "Summit 12km"
distance = 12.0
terrain_factor = 0.6
description = "Steep climb to the top"
"#;

    #[test]
    fn test_builtin_lookup() {
        let registry = CourseRegistry::builtin();
        let course = registry.get("947-joburg").unwrap();
        assert_eq!(course.total_distance, 98.0);
        assert_eq!(course.checkpoints.len(), 5);
        assert!(course.is_hill_warning("Mandela Bridge 84.2km"));
        assert!(!course.is_hill_warning("M1 17km"));

        assert_eq!(registry.get("ctct").unwrap().checkpoints.len(), 9);
    }

    #[test]
    fn test_unknown_course_is_configuration_not_found() {
        let registry = CourseRegistry::builtin();
        match registry.get("tour-de-france") {
            Err(CourseError::ConfigurationNotFound { id }) => assert_eq!(id, "tour-de-france"),
            other => panic!("expected ConfigurationNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_course_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(HILL_CLIMB_TOML.as_bytes()).unwrap();

        let mut registry = CourseRegistry::builtin();
        let added = registry.load_file(file.path()).unwrap();

        assert_eq!(added, 1);
        assert_eq!(registry.list().len(), 3);
        let course = registry.get("hill-climb").unwrap();
        assert_eq!(course.checkpoints[1].terrain_factor, 0.6);
        assert_eq!(course.pace_validation.elite_minutes, 25.0);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = CourseRegistry::builtin();
        let mut course = registry.get("ctct").unwrap().clone();
        course.info_banner = "Windy today".to_string();

        registry.register(course).unwrap();

        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.get("ctct").unwrap().info_banner, "Windy today");
    }

    #[test]
    fn test_register_rejects_invalid_course() {
        let mut registry = CourseRegistry::new();
        let mut course = CourseRegistry::builtin().get("947-joburg").unwrap().clone();
        course.checkpoints[2].terrain_factor = 0.0;

        assert!(matches!(
            registry.register(course),
            Err(CourseError::InvalidCourse { .. })
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_load_file_is_all_or_nothing() {
        let invalid = r#"
[[courses]]
id = "one-point"
name = "One Point Sprint"
short_name = "OPS"
total_distance = 5.0
location = "Pretoria, South Africa"
month = "June"
default_start_time = "08:00"
csv_filename_prefix = "one_point_splits"

[courses.pace_validation]
min_minutes = 6.0
elite_minutes = 7.0
beginner_warning_minutes = 12.0

[[courses.checkpoints]]
name = "Finish 5km"
distance = 5.0
terrain_factor = 1.0
description = "Straight line"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(format!("{}{}", HILL_CLIMB_TOML, invalid).as_bytes())
            .unwrap();

        let mut registry = CourseRegistry::builtin();
        assert!(matches!(
            registry.load_file(file.path()),
            Err(CourseError::InvalidCourse { .. })
        ));

        assert_eq!(registry.list().len(), 2);
        assert!(registry.get("hill-climb").is_err());
        assert!(registry.get("one-point").is_err());
    }

    #[test]
    fn test_load_file_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[[courses]]\nid = 42\n").unwrap();

        let mut registry = CourseRegistry::new();
        assert!(matches!(
            registry.load_file(file.path()),
            Err(CourseError::Parse { .. })
        ));
    }
}
