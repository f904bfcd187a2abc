//! Race plan assembly
//!
//! [`RacePlanner::plan_race`] is the single entry point: it resolves the
//! course and start time, fetches the forecast once (the only async step)
//! and hands everything to [`compute_plan`], the synchronous core that chains
//! split calculation, nutrition scheduling, weather correlation and the pace
//! judgment. [`PlanSession`] wraps a planner for callers that resubmit
//! requests and only care about the newest result.

use chrono::NaiveTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::courses::CourseRegistry;
use crate::error::{Result, RideWiseError, WeatherError};
use crate::models::{
    NutritionStrategy, PaceJudgment, RaceCourse, RacePlan, RiderProfile,
};
use crate::nutrition::NutritionScheduler;
use crate::pace::PaceValidator;
use crate::splits::SplitCalculator;
use crate::time_of_day::{parse_start_time, time_of_day};
use crate::weather::{WeatherCorrelator, WeatherForecast, WeatherProvider, WeatherRequest};

/// What to do when the forecast cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherFailurePolicy {
    /// Log a warning and plan without weather
    #[default]
    Degrade,
    /// Fail the whole request
    Abort,
}

impl FromStr for WeatherFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degrade" => Ok(WeatherFailurePolicy::Degrade),
            "abort" => Ok(WeatherFailurePolicy::Abort),
            _ => Err(format!("Invalid weather failure policy: {}", s)),
        }
    }
}

impl fmt::Display for WeatherFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherFailurePolicy::Degrade => write!(f, "degrade"),
            WeatherFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Forecast fetch settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerSettings {
    /// Upper bound on a single forecast request
    pub weather_timeout: Duration,

    /// Behaviour on provider failure or timeout
    pub failure_policy: WeatherFailurePolicy,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            weather_timeout: Duration::from_secs(10),
            failure_policy: WeatherFailurePolicy::Degrade,
        }
    }
}

/// One planning request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub course_id: String,
    pub target_hours: u32,
    pub target_minutes: u32,

    /// HH:MM override of the course's default start time
    pub start_time: Option<String>,

    pub rider_profile: RiderProfile,
    pub nutrition_strategy: NutritionStrategy,
}

impl PlanRequest {
    /// Request with the default profile, strategy and start time
    pub fn new(course_id: impl Into<String>, target_hours: u32, target_minutes: u32) -> Self {
        Self {
            course_id: course_id.into(),
            target_hours,
            target_minutes,
            start_time: None,
            rider_profile: RiderProfile::default(),
            nutrition_strategy: NutritionStrategy::default(),
        }
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn with_rider_profile(mut self, rider_profile: RiderProfile) -> Self {
        self.rider_profile = rider_profile;
        self
    }

    pub fn with_nutrition_strategy(mut self, nutrition_strategy: NutritionStrategy) -> Self {
        self.nutrition_strategy = nutrition_strategy;
        self
    }

    pub fn target_total_minutes(&self) -> f64 {
        f64::from(self.target_hours) * 60.0 + f64::from(self.target_minutes)
    }
}

/// Stateless race planner
pub struct RacePlanner {
    registry: CourseRegistry,
    provider: Option<Arc<dyn WeatherProvider>>,
    settings: PlannerSettings,
}

impl RacePlanner {
    /// Planner without a forecast provider
    pub fn new(registry: CourseRegistry) -> Self {
        Self {
            registry,
            provider: None,
            settings: PlannerSettings::default(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_settings(mut self, settings: PlannerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &CourseRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Build the complete plan for a request
    ///
    /// Returns `Ok(None)` when the target is zero, before the start time is
    /// looked at. An unknown course, a target beyond
    /// [`MAX_TARGET_MINUTES`] or a malformed start time is an error; a
    /// forecast failure is an error only under [`WeatherFailurePolicy::Abort`].
    #[instrument(skip(self, request), fields(course = %request.course_id))]
    pub async fn plan_race(&self, request: &PlanRequest) -> Result<Option<RacePlan>> {
        let course = self.registry.get(&request.course_id)?;
        debug!(name = %course.name, "Course resolved");

        let target = request.target_total_minutes();
        if target <= 0.0 {
            debug!("Zero target time, nothing to plan");
            return Ok(None);
        }
        check_target(target)?;

        let start_time = match &request.start_time {
            Some(value) => parse_start_time(value)?,
            None => parse_start_time(&course.default_start_time)?,
        };

        let forecast = self.fetch_forecast(course, start_time, target).await?;

        let plan = compute_plan(
            course,
            target,
            start_time,
            request.rider_profile,
            request.nutrition_strategy,
            forecast.as_ref(),
        )?;

        if let Some(plan) = &plan {
            info!(
                target_minutes = plan.target_total_minutes,
                average_speed = plan.overall_average_speed,
                events = plan.nutrition_events.len(),
                weather = plan.weather_available,
                "Race plan ready"
            );
        }
        Ok(plan)
    }

    async fn fetch_forecast(
        &self,
        course: &RaceCourse,
        start_time: NaiveTime,
        target_total_minutes: f64,
    ) -> Result<Option<WeatherForecast>> {
        let Some(provider) = &self.provider else {
            return Ok(None);
        };

        let request = WeatherRequest::for_course(course, start_time, target_total_minutes);
        let timeout = self.settings.weather_timeout;

        let outcome = match tokio::time::timeout(timeout, provider.forecast(&request)).await {
            Ok(result) => result,
            Err(_) => Err(WeatherError::Timeout { timeout }),
        };

        match outcome {
            Ok(mut forecast) => {
                let dropped = forecast.discard_malformed();
                if !dropped.is_empty() {
                    warn!(
                        dropped = dropped.len(),
                        first = %dropped[0].time,
                        "Ignoring forecast entries without an HH:00 hour key"
                    );
                }
                debug!(entries = forecast.hourly.len(), "Forecast received");
                Ok(Some(forecast))
            }
            Err(err) => match self.settings.failure_policy {
                WeatherFailurePolicy::Degrade => {
                    warn!(error = %err, "Forecast unavailable, planning without weather");
                    Ok(None)
                }
                WeatherFailurePolicy::Abort => Err(err.into()),
            },
        }
    }
}

/// Longest target finish time accepted for planning
pub const MAX_TARGET_MINUTES: f64 = 24.0 * 60.0;

fn check_target(target_total_minutes: f64) -> Result<()> {
    if target_total_minutes > MAX_TARGET_MINUTES {
        return Err(RideWiseError::Validation(format!(
            "target of {} minutes exceeds the {} minute limit",
            target_total_minutes, MAX_TARGET_MINUTES
        )));
    }
    Ok(())
}

/// Synchronous planning core
///
/// Returns `Ok(None)` for a non-positive target and a validation error for a
/// target beyond [`MAX_TARGET_MINUTES`].
pub fn compute_plan(
    course: &RaceCourse,
    target_total_minutes: f64,
    start_time: NaiveTime,
    rider_profile: RiderProfile,
    nutrition_strategy: NutritionStrategy,
    forecast: Option<&WeatherForecast>,
) -> Result<Option<RacePlan>> {
    check_target(target_total_minutes)?;
    let Some(splits) = SplitCalculator::calculate(course, target_total_minutes, start_time)? else {
        return Ok(None);
    };

    let nutrition_events = NutritionScheduler::schedule(
        &splits,
        target_total_minutes,
        nutrition_strategy,
        course,
        start_time,
    );
    let splits = NutritionScheduler::attach(splits, &nutrition_events);
    let splits = match forecast {
        Some(forecast) => WeatherCorrelator::new(forecast).correlate(splits),
        None => splits,
    };

    let pace_judgment =
        PaceValidator::judge(target_total_minutes, rider_profile, &course.pace_validation);

    Ok(Some(RacePlan {
        course_id: course.id.clone(),
        course_name: course.name.clone(),
        csv_filename_prefix: course.csv_filename_prefix.clone(),
        info_banner: course.info_banner.clone(),
        target_total_minutes,
        start_time: start_time.format("%H:%M").to_string(),
        overall_average_speed: course.total_distance / (target_total_minutes / 60.0),
        rider_profile,
        nutrition_strategy,
        splits,
        nutrition_events,
        pace_judgment,
        weather_available: forecast.is_some(),
    }))
}

/// Summary of one target in a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub target_total_minutes: f64,
    pub overall_average_speed: f64,
    pub finish_time_of_day: String,
    pub nutrition_event_count: usize,
    pub pace_judgment: PaceJudgment,
}

/// Plan many target times in parallel, without weather
///
/// Rows come back in the order of `targets`; non-positive targets are
/// skipped.
pub fn sweep(
    course: &RaceCourse,
    targets: &[f64],
    start_time: NaiveTime,
    rider_profile: RiderProfile,
    nutrition_strategy: NutritionStrategy,
) -> Result<Vec<SweepRow>> {
    course.validate()?;
    debug!(course = %course.id, targets = targets.len(), "Sweeping target times");

    targets
        .par_iter()
        .filter_map(|&target| {
            compute_plan(
                course,
                target,
                start_time,
                rider_profile,
                nutrition_strategy,
                None,
            )
            .transpose()
        })
        .map(|plan| {
            plan.map(|plan| SweepRow {
                target_total_minutes: plan.target_total_minutes,
                overall_average_speed: plan.overall_average_speed,
                finish_time_of_day: time_of_day(start_time, plan.target_total_minutes),
                nutrition_event_count: plan.nutrition_events.len(),
                pace_judgment: plan.pace_judgment,
            })
        })
        .collect()
}

/// Plan published by a [`PlanSession`]
#[derive(Debug, Clone)]
pub struct PublishedPlan {
    pub generation: u64,
    pub plan: Arc<RacePlan>,
}

/// Result of a [`PlanSession::submit`]
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The plan is now the session's latest
    Published(Arc<RacePlan>),
    /// A newer request finished first; the plan was discarded
    Superseded,
    /// The request produced no plan (zero target)
    NoPlan,
}

/// Latest-wins wrapper around a planner
///
/// Every submission takes a new generation number. A finished plan is only
/// published when no newer generation has been published, so a slow,
/// superseded request never overwrites a fresher result.
pub struct PlanSession {
    planner: Arc<RacePlanner>,
    generation: AtomicU64,
    latest: watch::Sender<Option<PublishedPlan>>,
}

impl PlanSession {
    pub fn new(planner: Arc<RacePlanner>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            planner,
            generation: AtomicU64::new(0),
            latest,
        }
    }

    /// Watch the latest published plan
    pub fn subscribe(&self) -> watch::Receiver<Option<PublishedPlan>> {
        self.latest.subscribe()
    }

    /// Most recently published plan
    pub fn latest(&self) -> Option<PublishedPlan> {
        self.latest.borrow().clone()
    }

    /// Plan a request and publish the result unless it has been superseded
    pub async fn submit(&self, request: &PlanRequest) -> Result<SubmitOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(plan) = self.planner.plan_race(request).await? else {
            return Ok(SubmitOutcome::NoPlan);
        };
        let plan = Arc::new(plan);

        let published = self.latest.send_if_modified(|current| {
            if current.as_ref().is_some_and(|p| p.generation > generation) {
                return false;
            }
            *current = Some(PublishedPlan {
                generation,
                plan: Arc::clone(&plan),
            });
            true
        });

        if published {
            Ok(SubmitOutcome::Published(plan))
        } else {
            debug!(generation, "Discarding superseded plan");
            Ok(SubmitOutcome::Superseded)
        }
    }
}
