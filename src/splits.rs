use chrono::NaiveTime;
use tracing::debug;

use crate::error::CourseError;
use crate::models::{RaceCourse, Split};
use crate::time_of_day::time_of_day;

/// Terrain-adjusted split calculation
///
/// Each checkpoint's segment is ridden at the base average speed scaled by
/// its terrain factor. Terrain factors rarely average out to exactly 1 over
/// a course, so the raw segment times are then scaled uniformly until they
/// sum to the target finish time.
pub struct SplitCalculator;

/// Segment time before normalization
struct RawSegment {
    split_distance: f64,
    raw_split_time: f64,
}

impl SplitCalculator {
    /// Calculate normalized splits for a target finish time
    ///
    /// Returns `Ok(None)` without computing anything when the target is not
    /// a positive number of minutes. Courses that break the checkpoint
    /// invariants are rejected before any division happens.
    pub fn calculate(
        course: &RaceCourse,
        target_total_minutes: f64,
        start_time: NaiveTime,
    ) -> Result<Option<Vec<Split>>, CourseError> {
        if !(target_total_minutes.is_finite() && target_total_minutes > 0.0) {
            debug!(target_total_minutes, "Skipping split calculation for non-positive target");
            return Ok(None);
        }

        course.validate()?;

        let base_average_speed = course.total_distance / (target_total_minutes / 60.0);

        let mut previous_distance = 0.0;
        let mut raw_cumulative_time = 0.0;
        let raw_segments: Vec<RawSegment> = course
            .checkpoints
            .iter()
            .map(|checkpoint| {
                let split_distance = checkpoint.distance - previous_distance;
                let adjusted_speed = base_average_speed * checkpoint.terrain_factor;
                let raw_split_time = (split_distance / adjusted_speed) * 60.0;

                previous_distance = checkpoint.distance;
                raw_cumulative_time += raw_split_time;

                RawSegment {
                    split_distance,
                    raw_split_time,
                }
            })
            .collect();

        let normalization_factor = target_total_minutes / raw_cumulative_time;
        debug!(
            course = %course.id,
            base_average_speed,
            raw_cumulative_time,
            normalization_factor,
            "Normalizing raw split times"
        );

        let mut cumulative_time = 0.0;
        let splits = course
            .checkpoints
            .iter()
            .zip(raw_segments)
            .map(|(checkpoint, raw)| {
                let split_time_minutes = raw.raw_split_time * normalization_factor;
                cumulative_time += split_time_minutes;

                Split {
                    checkpoint_name: checkpoint.name.clone(),
                    distance: checkpoint.distance,
                    split_distance: raw.split_distance,
                    split_time_minutes,
                    cumulative_time_minutes: cumulative_time,
                    time_of_day: time_of_day(start_time, cumulative_time),
                    speed_on_split: raw.split_distance / (split_time_minutes / 60.0),
                    moving_average_speed: checkpoint.distance / (cumulative_time / 60.0),
                    terrain_factor: checkpoint.terrain_factor,
                    description: checkpoint.description.clone(),
                    nutrition_events: Vec::new(),
                    weather: None,
                }
            })
            .collect();

        Ok(Some(splits))
    }
}
