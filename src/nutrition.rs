use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{NutritionEvent, NutritionEventKind, NutritionStrategy, RaceCourse, Split};
use crate::time_of_day::time_of_day;

/// First fuel event, minutes into the race
const FIRST_FUEL_MINUTES: f64 = 15.0;

/// No fuel event within this many minutes of the finish
const FUEL_CUTOFF_MINUTES: f64 = 10.0;

/// First hydration event, minutes into the race
const FIRST_HYDRATION_MINUTES: f64 = 10.0;

/// Hydration cadence, independent of the fueling strategy
const HYDRATION_INTERVAL_MINUTES: f64 = 20.0;

/// No hydration event within this many minutes of the finish
const HYDRATION_CUTOFF_MINUTES: f64 = 5.0;

/// Events closer than this to a hill warning checkpoint are flagged
const PRE_HILL_WINDOW_MINUTES: f64 = 15.0;

/// Fueling cadence and carbohydrate target of a nutrition strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    /// Minutes between fuel events
    pub fueling_interval_minutes: f64,

    /// Lower end of the hourly carbohydrate target in grams
    pub carbs_per_hour_min: f64,

    /// Upper end of the hourly carbohydrate target in grams
    pub carbs_per_hour_max: f64,
}

impl StrategyProfile {
    /// Profile for a strategy, `None` when the strategy schedules nothing
    pub fn for_strategy(strategy: NutritionStrategy) -> Option<Self> {
        let (interval, min, max) = match strategy {
            NutritionStrategy::Aggressive => (20.0, 90.0, 90.0),
            NutritionStrategy::Standard => (30.0, 60.0, 60.0),
            NutritionStrategy::Conservative => (45.0, 40.0, 50.0),
            NutritionStrategy::None => return None,
        };
        Some(StrategyProfile {
            fueling_interval_minutes: interval,
            carbs_per_hour_min: min,
            carbs_per_hour_max: max,
        })
    }

    /// Hourly carbohydrate target used for dosing (midpoint of the range)
    pub fn carbs_per_hour(&self) -> f64 {
        (self.carbs_per_hour_min + self.carbs_per_hour_max) / 2.0
    }

    /// Grams of carbohydrate per fuel event
    pub fn dose_grams(&self) -> u32 {
        let doses_per_hour = 60.0 / self.fueling_interval_minutes;
        (self.carbs_per_hour() / doses_per_hour).round() as u32
    }

    fn carbs_label(&self) -> String {
        if self.carbs_per_hour_min == self.carbs_per_hour_max {
            format!("{}g/h", self.carbs_per_hour_min)
        } else {
            format!("{}-{}g/h", self.carbs_per_hour_min, self.carbs_per_hour_max)
        }
    }
}

/// Fuel and hydration schedule generation
pub struct NutritionScheduler;

impl NutritionScheduler {
    /// Generate the time-ordered event list for a set of normalized splits
    ///
    /// Events whose time falls after the last split are dropped. On an exact
    /// time tie, the fuel event comes first.
    pub fn schedule(
        splits: &[Split],
        target_total_minutes: f64,
        strategy: NutritionStrategy,
        course: &RaceCourse,
        start_time: NaiveTime,
    ) -> Vec<NutritionEvent> {
        let Some(profile) = StrategyProfile::for_strategy(strategy) else {
            return Vec::new();
        };

        let fuel_details = format!(
            "Fuel: {}g carbs (gel, bar or drink mix), every {}min for {}",
            profile.dose_grams(),
            profile.fueling_interval_minutes,
            profile.carbs_label()
        );
        let hydration_details =
            "Hydration: 150-200ml fluid with electrolytes, every 20min".to_string();

        let fuel_times = ticks(
            FIRST_FUEL_MINUTES,
            profile.fueling_interval_minutes,
            target_total_minutes - FUEL_CUTOFF_MINUTES,
        );
        let hydration_times = ticks(
            FIRST_HYDRATION_MINUTES,
            HYDRATION_INTERVAL_MINUTES,
            target_total_minutes - HYDRATION_CUTOFF_MINUTES,
        );

        let mut events: Vec<NutritionEvent> = fuel_times
            .into_iter()
            .map(|time| (time, NutritionEventKind::Fuel, &fuel_details))
            .chain(
                hydration_times
                    .into_iter()
                    .map(|time| (time, NutritionEventKind::Hydration, &hydration_details)),
            )
            .filter_map(|(time, kind, details)| {
                build_event(splits, course, start_time, time, kind, details)
            })
            .collect();

        // Stable sort keeps fuel ahead of hydration on equal times
        events.sort_by(|a, b| a.time_minutes.total_cmp(&b.time_minutes));

        debug!(
            strategy = %strategy,
            events = events.len(),
            pre_hill = events.iter().filter(|e| e.is_pre_hill_warning).count(),
            "Nutrition schedule generated"
        );
        events
    }

    /// Return the splits with each one's events attached
    ///
    /// A split receives the events with time in
    /// `(previous.cumulative_time, this.cumulative_time]`.
    pub fn attach(splits: Vec<Split>, events: &[NutritionEvent]) -> Vec<Split> {
        let mut previous_cumulative = f64::NEG_INFINITY;
        splits
            .into_iter()
            .map(|split| {
                let upper = split.cumulative_time_minutes;
                let nutrition_events = events
                    .iter()
                    .filter(|event| {
                        event.time_minutes > previous_cumulative && event.time_minutes <= upper
                    })
                    .cloned()
                    .collect();
                previous_cumulative = upper;
                Split {
                    nutrition_events,
                    ..split
                }
            })
            .collect()
    }
}

/// `first, first + interval, ...` strictly below `limit`
fn ticks(first: f64, interval: f64, limit: f64) -> Vec<f64> {
    let mut times = Vec::new();
    let mut index = 0u32;
    loop {
        let time = first + f64::from(index) * interval;
        if !(time < limit) {
            break;
        }
        times.push(time);
        index += 1;
    }
    times
}

fn build_event(
    splits: &[Split],
    course: &RaceCourse,
    start_time: NaiveTime,
    time: f64,
    kind: NutritionEventKind,
    details: &str,
) -> Option<NutritionEvent> {
    let index = splits
        .iter()
        .position(|split| split.cumulative_time_minutes >= time)?;
    let split = &splits[index];

    let (previous_distance, previous_time) = match index {
        0 => (0.0, 0.0),
        _ => (
            splits[index - 1].distance,
            splits[index - 1].cumulative_time_minutes,
        ),
    };
    let distance = previous_distance
        + (time - previous_time) / split.split_time_minutes * split.split_distance;

    let is_pre_hill_warning = course.is_hill_warning(&split.checkpoint_name)
        && split.cumulative_time_minutes - time < PRE_HILL_WINDOW_MINUTES;

    let details = if is_pre_hill_warning {
        format!("{} - climb ahead at {}", details, split.checkpoint_name)
    } else {
        details.to_string()
    };

    Some(NutritionEvent {
        time_minutes: time,
        time_of_day: time_of_day(start_time, time),
        kind,
        details,
        distance,
        associated_checkpoint_name: split.checkpoint_name.clone(),
        is_pre_hill_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::CourseRegistry;
    use crate::splits::SplitCalculator;
    use crate::time_of_day::parse_start_time;

    fn plan(course_id: &str, target: f64, strategy: NutritionStrategy) -> (Vec<Split>, Vec<NutritionEvent>) {
        let registry = CourseRegistry::builtin();
        let course = registry.get(course_id).unwrap();
        let start = parse_start_time("06:00").unwrap();
        let splits = SplitCalculator::calculate(course, target, start).unwrap().unwrap();
        let events = NutritionScheduler::schedule(&splits, target, strategy, course, start);
        (splits, events)
    }

    #[test]
    fn test_standard_strategy_first_events() {
        let (_, events) = plan("947-joburg", 225.0, NutritionStrategy::Standard);

        let first_fuel = events
            .iter()
            .find(|e| e.kind == NutritionEventKind::Fuel)
            .unwrap();
        assert_eq!(first_fuel.time_minutes, 15.0);
        assert!(first_fuel.details.contains("30min"));
        assert!(first_fuel.details.contains("30g"));
        assert_eq!(first_fuel.time_of_day, "06:15");

        let first_hydration = events
            .iter()
            .find(|e| e.kind == NutritionEventKind::Hydration)
            .unwrap();
        assert_eq!(first_hydration.time_minutes, 10.0);

        // Hydration first at 10, fuel at 15
        assert_eq!(events[0].kind, NutritionEventKind::Hydration);
        assert_eq!(events[1].kind, NutritionEventKind::Fuel);
    }

    #[test]
    fn test_event_cutoffs() {
        let (_, events) = plan("947-joburg", 225.0, NutritionStrategy::Standard);

        let fuel: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == NutritionEventKind::Fuel)
            .map(|e| e.time_minutes)
            .collect();
        assert_eq!(fuel, vec![15.0, 45.0, 75.0, 105.0, 135.0, 165.0, 195.0]);

        let hydration: Vec<f64> = events
            .iter()
            .filter(|e| e.kind == NutritionEventKind::Hydration)
            .map(|e| e.time_minutes)
            .collect();
        assert_eq!(hydration.first(), Some(&10.0));
        assert_eq!(hydration.last(), Some(&210.0));
        assert_eq!(hydration.len(), 11);
    }

    #[test]
    fn test_none_strategy_is_empty() {
        let (_, events) = plan("947-joburg", 225.0, NutritionStrategy::None);
        assert!(events.is_empty());
    }

    #[test]
    fn test_strategy_doses() {
        let aggressive = StrategyProfile::for_strategy(NutritionStrategy::Aggressive).unwrap();
        assert_eq!(aggressive.dose_grams(), 30);

        let standard = StrategyProfile::for_strategy(NutritionStrategy::Standard).unwrap();
        assert_eq!(standard.dose_grams(), 30);

        let conservative = StrategyProfile::for_strategy(NutritionStrategy::Conservative).unwrap();
        assert_eq!(conservative.carbs_per_hour(), 45.0);
        assert_eq!(conservative.dose_grams(), 34);
        assert_eq!(conservative.carbs_label(), "40-50g/h");
    }

    #[test]
    fn test_distance_is_interpolated_within_split() {
        let (splits, events) = plan("947-joburg", 225.0, NutritionStrategy::Standard);
        let first = &splits[0];

        let hydration = &events[0];
        let expected = 10.0 / first.split_time_minutes * first.split_distance;
        assert!((hydration.distance - expected).abs() < 1e-9);
        assert_eq!(hydration.associated_checkpoint_name, "M1 17km");
    }

    #[test]
    fn test_pre_hill_flag() {
        let (splits, events) = plan("947-joburg", 225.0, NutritionStrategy::Aggressive);

        let flagged: Vec<&NutritionEvent> =
            events.iter().filter(|e| e.is_pre_hill_warning).collect();
        assert!(!flagged.is_empty());

        for event in flagged {
            let split = splits
                .iter()
                .find(|s| s.checkpoint_name == event.associated_checkpoint_name)
                .unwrap();
            assert!(split.cumulative_time_minutes - event.time_minutes < 15.0);
            assert!(event.details.contains("climb ahead"));
        }
    }

    #[test]
    fn test_conservative_tie_orders_fuel_first() {
        let (_, events) = plan("947-joburg", 225.0, NutritionStrategy::Conservative);

        let at_150: Vec<NutritionEventKind> = events
            .iter()
            .filter(|e| e.time_minutes == 150.0)
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            at_150,
            vec![NutritionEventKind::Fuel, NutritionEventKind::Hydration]
        );
    }

    #[test]
    fn test_events_without_enclosing_split_are_dropped() {
        let registry = CourseRegistry::builtin();
        let course = registry.get("947-joburg").unwrap();
        let start = parse_start_time("06:00").unwrap();
        let mut splits = SplitCalculator::calculate(course, 225.0, start).unwrap().unwrap();
        splits.truncate(2);
        let cutoff = splits[1].cumulative_time_minutes;

        let events =
            NutritionScheduler::schedule(&splits, 225.0, NutritionStrategy::Standard, course, start);

        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.time_minutes <= cutoff));
    }

    #[test]
    fn test_attach_partitions_events() {
        let (splits, events) = plan("ctct", 270.0, NutritionStrategy::Standard);
        let annotated = NutritionScheduler::attach(splits, &events);

        let attached: usize = annotated.iter().map(|s| s.nutrition_events.len()).sum();
        assert_eq!(attached, events.len());

        let mut previous = 0.0;
        for split in &annotated {
            for event in &split.nutrition_events {
                assert!(event.time_minutes > previous);
                assert!(event.time_minutes <= split.cumulative_time_minutes);
                assert_eq!(event.associated_checkpoint_name, split.checkpoint_name);
            }
            previous = split.cumulative_time_minutes;
        }
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_schedule_properties(
            target in 30.0f64..600.0,
            course_index in 0usize..2,
            strategy_index in 0usize..3,
        ) {
            let registry = CourseRegistry::builtin();
            let course = &registry.list()[course_index];
            let strategy = [
                NutritionStrategy::Aggressive,
                NutritionStrategy::Standard,
                NutritionStrategy::Conservative,
            ][strategy_index];
            let start = parse_start_time("06:00").unwrap();
            let splits = SplitCalculator::calculate(course, target, start).unwrap().unwrap();
            let events = NutritionScheduler::schedule(&splits, target, strategy, course, start);

            for pair in events.windows(2) {
                prop_assert!(pair[0].time_minutes <= pair[1].time_minutes);
                if strategy != NutritionStrategy::Conservative {
                    prop_assert!(pair[0].time_minutes < pair[1].time_minutes);
                }
            }

            for event in &events {
                let split = splits
                    .iter()
                    .find(|s| s.cumulative_time_minutes >= event.time_minutes)
                    .unwrap();
                prop_assert_eq!(&split.checkpoint_name, &event.associated_checkpoint_name);
                prop_assert!(event.distance > 0.0 && event.distance <= split.distance + 1e-9);
                if event.is_pre_hill_warning {
                    prop_assert!(split.cumulative_time_minutes - event.time_minutes < 15.0);
                }
            }
        }
    }
}
