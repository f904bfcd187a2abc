use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, warn};

use ridewise::config::{AppConfig, CONFIG_KEYS};
use ridewise::error::ErrorSeverity;
use ridewise::export::{self, ExportFormat};
use ridewise::logging::init_logging;
use ridewise::time_of_day::{format_duration, parse_start_time};
use ridewise::{
    CourseRegistry, JsonForecastProvider, JudgmentLevel, NutritionStrategy, PaceJudgment,
    PlanRequest, RacePlan, RacePlanner, RideWiseError, RiderProfile,
};

/// RideWise - Race Pacing CLI
///
/// Terrain-aware split times, fueling schedules and pace checks for
/// fixed-route cycling races.
#[derive(Parser)]
#[command(name = "ridewise")]
#[command(author = "RideWise Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Race pacing and nutrition planner", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Additional course file(s) to load
    #[arg(long = "courses", value_name = "FILE")]
    course_files: Vec<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan splits, nutrition and pace for a target finish time
    Plan {
        /// Course identifier (see `ridewise courses`)
        #[arg(short = 'r', long)]
        course: Option<String>,

        /// Target hours
        #[arg(short = 'H', long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=24))]
        hours: u32,

        /// Target minutes
        #[arg(short = 'M', long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=59))]
        minutes: u32,

        /// Start time (HH:MM), defaults to the course start
        #[arg(short, long)]
        start: Option<String>,

        /// Rider profile (beginner, intermediate, pro)
        #[arg(short, long)]
        profile: Option<RiderProfile>,

        /// Nutrition strategy (aggressive, standard, conservative, none)
        #[arg(short = 'n', long)]
        strategy: Option<NutritionStrategy>,

        /// Hourly forecast JSON file
        #[arg(short = 'w', long, value_name = "FILE")]
        forecast: Option<PathBuf>,

        /// Skip the weather forecast even when configured
        #[arg(long)]
        no_weather: bool,

        /// Export the plan (csv, json, text)
        #[arg(short = 'e', long = "export", value_name = "FORMAT")]
        export_format: Option<ExportFormat>,

        /// Export directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// List available courses or show one course in detail
    Courses {
        /// Course identifier to show
        #[arg(short, long)]
        id: Option<String>,
    },

    /// Validate a TOML course file
    Validate {
        /// Course file path
        file: PathBuf,
    },

    /// Compare a range of target times on one course
    Sweep {
        /// Course identifier
        #[arg(short = 'r', long)]
        course: Option<String>,

        /// Fastest target in minutes
        #[arg(long, default_value = "150", value_parser = clap::value_parser!(u32).range(1..=1440))]
        from: u32,

        /// Slowest target in minutes
        #[arg(long, default_value = "360", value_parser = clap::value_parser!(u32).range(1..=1440))]
        to: u32,

        /// Step between targets in minutes
        #[arg(long, default_value = "15")]
        step: u32,

        /// Start time (HH:MM), defaults to the course start
        #[arg(short, long)]
        start: Option<String>,

        /// Rider profile (beginner, intermediate, pro)
        #[arg(short, long)]
        profile: Option<RiderProfile>,

        /// Nutrition strategy (aggressive, standard, conservative, none)
        #[arg(short = 'n', long)]
        strategy: Option<NutritionStrategy>,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (key=value)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct SplitRow {
    #[tabled(rename = "Point on Route")]
    point: String,
    #[tabled(rename = "Km")]
    distance: String,
    #[tabled(rename = "Time to Point")]
    elapsed: String,
    #[tabled(rename = "Split")]
    split: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Avg")]
    average: String,
    #[tabled(rename = "Clock")]
    clock: String,
    #[tabled(rename = "Terrain")]
    terrain: String,
    #[tabled(rename = "Weather")]
    weather: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Clock")]
    clock: String,
    #[tabled(rename = "Km")]
    distance: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Before")]
    checkpoint: String,
    #[tabled(rename = "Details")]
    details: String,
}

#[derive(Tabled)]
struct CourseRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Race")]
    name: String,
    #[tabled(rename = "Km")]
    distance: String,
    #[tabled(rename = "Checkpoints")]
    checkpoints: usize,
    #[tabled(rename = "Where")]
    location: String,
    #[tabled(rename = "When")]
    month: String,
    #[tabled(rename = "Start")]
    start: String,
}

#[derive(Tabled)]
struct CheckpointRow {
    #[tabled(rename = "Checkpoint")]
    name: String,
    #[tabled(rename = "Km")]
    distance: String,
    #[tabled(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Terrain")]
    terrain: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct SweepTableRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Avg km/h")]
    speed: String,
    #[tabled(rename = "Finish")]
    finish: String,
    #[tabled(rename = "Events")]
    events: usize,
    #[tabled(rename = "Pace Check")]
    judgment: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path);

    // Each -v raises the configured level by one step
    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {}", log_config.level).dimmed());
    }

    match cli.command {
        Commands::Plan {
            course,
            hours,
            minutes,
            start,
            profile,
            strategy,
            forecast,
            no_weather,
            export_format,
            output,
        } => {
            let registry = load_registry(&config, &cli.course_files)?;
            let request = PlanRequest {
                course_id: course.unwrap_or_else(|| config.defaults.course_id.clone()),
                target_hours: hours,
                target_minutes: minutes,
                start_time: start.or_else(|| config.defaults.start_time.clone()),
                rider_profile: profile.unwrap_or(config.defaults.rider_profile),
                nutrition_strategy: strategy.unwrap_or(config.defaults.nutrition_strategy),
            };

            let mut planner = RacePlanner::new(registry).with_settings(config.planner_settings());
            let forecast_file = forecast.or_else(|| {
                config
                    .weather
                    .enabled
                    .then(|| config.weather.forecast_file.clone())
                    .flatten()
            });
            if let (false, Some(path)) = (no_weather, forecast_file) {
                planner = planner.with_provider(Arc::new(JsonForecastProvider::new(path)));
            }

            let plan = match planner.plan_race(&request).await {
                Ok(Some(plan)) => plan,
                Ok(None) => {
                    println!(
                        "{}",
                        "Target time is zero, nothing to plan. Pass --hours and/or --minutes."
                            .yellow()
                    );
                    return Ok(());
                }
                Err(e) => return Err(report(e)),
            };

            print_plan(&plan);

            if let Some(format) = export_format.or_else(|| output.as_ref().map(|_| config.export.format)) {
                let dir = output.unwrap_or_else(|| config.export.output_dir.clone());
                let path = export::export_plan_to_dir(&plan, format, &dir)
                    .map_err(|e| report(e.into()))?;
                println!("{} {}", "✓ Plan exported to".green(), path.display());
            }
        }

        Commands::Courses { id } => {
            let registry = load_registry(&config, &cli.course_files)?;
            match id {
                Some(id) => {
                    let course = registry.get(&id).map_err(|e| report(e.into()))?;
                    println!("{}", course.name.bold());
                    println!(
                        "  {:.1} km, {} ({}), start {}",
                        course.total_distance, course.location, course.month, course.default_start_time
                    );
                    if !course.info_banner.is_empty() {
                        println!("  {}", course.info_banner.italic());
                    }

                    let rows: Vec<CheckpointRow> = course
                        .checkpoints
                        .iter()
                        .map(|checkpoint| CheckpointRow {
                            name: if course.is_hill_warning(&checkpoint.name) {
                                format!("{} ▲", checkpoint.name)
                            } else {
                                checkpoint.name.clone()
                            },
                            distance: format!("{:.1}", checkpoint.distance),
                            factor: format!("{:.2}", checkpoint.terrain_factor),
                            terrain: ridewise::TerrainDifficulty::from_factor(checkpoint.terrain_factor)
                                .legend()
                                .to_string(),
                            description: checkpoint.description.clone(),
                        })
                        .collect();
                    println!("{}", Table::new(rows).with(Style::rounded()));

                    let thresholds = &course.pace_validation;
                    println!(
                        "  Elite {}  |  Fastest realistic {}  |  Beginner warning under {}",
                        format_duration(thresholds.elite_minutes),
                        format_duration(thresholds.min_minutes),
                        format_duration(thresholds.beginner_warning_minutes)
                    );
                }
                None => {
                    let rows: Vec<CourseRow> = registry
                        .list()
                        .iter()
                        .map(|course| CourseRow {
                            id: course.id.clone(),
                            name: course.name.clone(),
                            distance: format!("{:.1}", course.total_distance),
                            checkpoints: course.checkpoints.len(),
                            location: course.location.clone(),
                            month: course.month.clone(),
                            start: course.default_start_time.clone(),
                        })
                        .collect();
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            }
        }

        Commands::Validate { file } => {
            let mut registry = CourseRegistry::new();
            match registry.load_file(&file) {
                Ok(count) => {
                    println!(
                        "{} {} course(s) in {} are valid",
                        "✓".green(),
                        count,
                        file.display()
                    );
                    for course in registry.list() {
                        println!(
                            "  {} - {} ({:.1} km, {} checkpoints)",
                            course.id,
                            course.name,
                            course.total_distance,
                            course.checkpoints.len()
                        );
                    }
                }
                Err(e) => return Err(report(e.into())),
            }
        }

        Commands::Sweep {
            course,
            from,
            to,
            step,
            start,
            profile,
            strategy,
        } => {
            if step == 0 || from > to {
                bail!("Sweep needs --from <= --to and a positive --step");
            }

            let registry = load_registry(&config, &cli.course_files)?;
            let course_id = course.unwrap_or_else(|| config.defaults.course_id.clone());
            let course = registry.get(&course_id).map_err(|e| report(e.into()))?;
            let start_value = start
                .or_else(|| config.defaults.start_time.clone())
                .unwrap_or_else(|| course.default_start_time.clone());
            let start_time = parse_start_time(&start_value).map_err(report)?;

            let targets: Vec<f64> = (from..=to).step_by(step as usize).map(f64::from).collect();
            let rows = ridewise::sweep(
                course,
                &targets,
                start_time,
                profile.unwrap_or(config.defaults.rider_profile),
                strategy.unwrap_or(config.defaults.nutrition_strategy),
            )
            .map_err(report)?;

            println!("{} from {}", course.name.bold(), start_value);
            let table_rows: Vec<SweepTableRow> = rows
                .into_iter()
                .map(|row| SweepTableRow {
                    target: format_duration(row.target_total_minutes),
                    speed: format!("{:.2}", row.overall_average_speed),
                    finish: row.finish_time_of_day,
                    events: row.nutrition_event_count,
                    judgment: judgment_title(&row.pace_judgment),
                })
                .collect();
            println!("{}", Table::new(table_rows).with(Style::rounded()));
        }

        Commands::Config {
            list,
            set,
            get,
            init,
        } => {
            let mut config = config;

            if init {
                config.save_to_file(&config_path)?;
                println!("{} {}", "✓ Wrote configuration to".green(), config_path.display());
            }

            if let Some(assignment) = set {
                let (key, value) = assignment
                    .split_once('=')
                    .context("Expected key=value, e.g. defaults.course_id=ctct")?;
                config.set(key.trim(), value.trim())?;
                config.save_to_file(&config_path)?;
                println!("{} {} = {}", "✓".green(), key.trim(), value.trim());
            }

            if let Some(key) = get {
                println!("{}", config.get(&key)?);
            }

            if list {
                println!("{}", config_path.display().to_string().dimmed());
                for key in CONFIG_KEYS {
                    println!("{} = {}", key.cyan(), config.get(key)?);
                }
                for file in &config.course_files {
                    println!("{} = {}", "course_files".cyan(), file.display());
                }
            }
        }
    }

    Ok(())
}

/// Built-in courses plus configured and command line course files
fn load_registry(config: &AppConfig, extra: &[PathBuf]) -> Result<CourseRegistry> {
    let mut registry = CourseRegistry::builtin();
    for path in config.course_files.iter().chain(extra) {
        registry
            .load_file(path)
            .with_context(|| format!("Failed to load courses from {}", path.display()))?;
    }
    Ok(registry)
}

/// Log an error at its severity and turn it into a user-facing message
fn report(err: RideWiseError) -> anyhow::Error {
    match err.severity() {
        ErrorSeverity::Warning => warn!(error = %err, retryable = err.is_retryable(), "Request failed"),
        ErrorSeverity::Error | ErrorSeverity::Critical => {
            error!(error = %err, retryable = err.is_retryable(), "Request failed")
        }
    }
    anyhow::anyhow!(err.user_message())
}

fn judgment_title(judgment: &PaceJudgment) -> String {
    let title = judgment.title.as_str();
    match judgment.level {
        JudgmentLevel::Error => title.red().to_string(),
        JudgmentLevel::Warning => title.yellow().to_string(),
        JudgmentLevel::Info => title.blue().to_string(),
        JudgmentLevel::Success => title.green().to_string(),
    }
}

fn print_plan(plan: &RacePlan) {
    let (hours, minutes) = plan.target_hours_minutes();

    println!("{}", plan.course_name.bold());
    println!(
        "  Target {}h{:02}m from {}  |  {:.2} km/h average  |  {} rider, {} nutrition",
        hours,
        minutes,
        plan.start_time,
        plan.overall_average_speed,
        plan.rider_profile,
        plan.nutrition_strategy
    );
    if !plan.info_banner.is_empty() {
        println!("  {}", plan.info_banner.italic());
    }
    println!();

    println!("{}", judgment_title(&plan.pace_judgment).bold());
    println!("  {}", plan.pace_judgment.message);
    println!();

    let rows: Vec<SplitRow> = plan
        .splits
        .iter()
        .map(|split| SplitRow {
            point: split.checkpoint_name.clone(),
            distance: format!("{:.1}", split.distance),
            elapsed: format_duration(split.cumulative_time_minutes),
            split: format_duration(split.split_time_minutes),
            speed: format!("{:.2}", split.speed_on_split),
            average: format!("{:.2}", split.moving_average_speed),
            clock: split.time_of_day.clone(),
            terrain: split.difficulty().legend().to_string(),
            weather: split
                .weather
                .as_ref()
                .map(export::csv::weather_summary)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    if !plan.nutrition_events.is_empty() {
        let rows: Vec<EventRow> = plan
            .nutrition_events
            .iter()
            .map(|event| EventRow {
                clock: event.time_of_day.clone(),
                distance: format!("{:.1}", event.distance),
                kind: if event.is_pre_hill_warning {
                    format!("{} ▲", event.kind)
                } else {
                    event.kind.to_string()
                },
                checkpoint: event.associated_checkpoint_name.clone(),
                details: event.details.clone(),
            })
            .collect();
        println!();
        println!("{}", "Nutrition".bold());
        println!("{}", Table::new(rows).with(Style::rounded()));
        println!("  {} marks fuel or fluid ahead of a major climb", "▲".yellow());
    }

    if !plan.weather_available {
        println!();
        println!("{}", "Weather forecast unavailable for this plan.".dimmed());
    }
}
