use super::ExportError;
use crate::export::csv::weather_summary;
use crate::models::RacePlan;
use crate::time_of_day::format_duration;
use std::io::Write;
use std::path::Path;

/// Write a human-readable race plan report
pub fn write_report<W: Write>(plan: &RacePlan, mut out: W) -> Result<(), ExportError> {
    let (hours, minutes) = plan.target_hours_minutes();

    // Header
    writeln!(out, "{:=<80}", "")?;
    writeln!(out, "RACE PLAN: {}", plan.course_name.to_uppercase())?;
    writeln!(out, "{:=<80}", "")?;
    writeln!(out)?;

    writeln!(out, "Target: {}h{:02}m", hours, minutes)?;
    writeln!(out, "Start: {}", plan.start_time)?;
    writeln!(out, "Average Speed: {:.2} km/h", plan.overall_average_speed)?;
    writeln!(out, "Rider Profile: {}", plan.rider_profile)?;
    writeln!(out, "Nutrition Strategy: {}", plan.nutrition_strategy)?;
    if !plan.info_banner.is_empty() {
        writeln!(out, "Race Tip: {}", plan.info_banner)?;
    }
    writeln!(out)?;

    writeln!(out, "PACE CHECK")?;
    writeln!(out, "{:-<80}", "")?;
    writeln!(out, "{}", plan.pace_judgment.title)?;
    writeln!(out, "{}", plan.pace_judgment.message)?;
    writeln!(out)?;

    writeln!(out, "SPLITS")?;
    writeln!(out, "{:-<80}", "")?;
    writeln!(
        out,
        "{:<28} {:>8} {:>10} {:>10} {:>8} {:>8} {:>6}",
        "Point on Route", "Km", "Elapsed", "Split", "Speed", "Avg", "Clock"
    )?;
    for split in &plan.splits {
        writeln!(
            out,
            "{:<28} {:>8.1} {:>10} {:>10} {:>8.2} {:>8.2} {:>6}",
            split.checkpoint_name,
            split.distance,
            format_duration(split.cumulative_time_minutes),
            format_duration(split.split_time_minutes),
            split.speed_on_split,
            split.moving_average_speed,
            split.time_of_day
        )?;
        writeln!(out, "  {} - {}", split.difficulty().legend(), split.description)?;
        if let Some(weather) = &split.weather {
            writeln!(out, "  Weather: {}", weather_summary(weather))?;
        }
    }
    writeln!(out)?;

    if !plan.nutrition_events.is_empty() {
        writeln!(out, "NUTRITION")?;
        writeln!(out, "{:-<80}", "")?;
        for event in &plan.nutrition_events {
            let marker = if event.is_pre_hill_warning { "!" } else { " " };
            writeln!(
                out,
                "{} {} ({:>5.1} km) {:<10} {}",
                marker,
                event.time_of_day,
                event.distance,
                event.kind.to_string(),
                event.details
            )?;
        }
        writeln!(out)?;
    }

    if !plan.weather_available {
        writeln!(out, "Weather forecast unavailable for this plan.")?;
        writeln!(out)?;
    }

    // Footer
    writeln!(out, "{:=<80}", "")?;
    writeln!(out, "End of Plan")?;

    Ok(())
}

/// Export a race plan to human-readable text format
pub fn export_plan<P: AsRef<Path>>(plan: &RacePlan, output_path: P) -> Result<(), ExportError> {
    let file = std::fs::File::create(output_path)?;
    write_report(plan, file)
}
