use crate::models::{JudgmentLevel, PaceJudgment, PaceThresholds, RiderProfile};

/// Multiplier on the elite time below which a target counts as competitive
const COMPETITIVE_FACTOR: f64 = 1.2;

/// Multiplier on the elite time up to which a target counts as realistic
const REALISTIC_FACTOR: f64 = 1.5;

/// Target finish time classification
///
/// The checks form a decision table evaluated in priority order; the first
/// matching row wins even when a later numeric threshold would also match:
/// 1. beginner and target < beginner warning → Warning
/// 2. pro and target > elite × 1.5 → Info (cruising)
/// 3. target < min → Error (elite professional pace)
/// 4. target < elite → Warning (very aggressive)
/// 5. target < elite × 1.2 → Info (competitive)
/// 6. target ≤ elite × 1.5 → Success (realistic)
/// 7. otherwise → Info (leisurely)
pub struct PaceValidator;

impl PaceValidator {
    /// Classify a target finish time for a rider profile
    pub fn judge(
        target_total_minutes: f64,
        profile: RiderProfile,
        thresholds: &PaceThresholds,
    ) -> PaceJudgment {
        let target = format_hours_minutes(target_total_minutes);
        let elite = thresholds.elite_minutes;

        if profile == RiderProfile::Beginner
            && target_total_minutes < thresholds.beginner_warning_minutes
        {
            return judgment(
                JudgmentLevel::Warning,
                "Ambitious Target for a Beginner",
                format!(
                    "A {} finish is aggressive for a first race on this course. Consider aiming for {} or slower and riding your own pace.",
                    target,
                    format_hours_minutes(thresholds.beginner_warning_minutes)
                ),
            );
        }

        if profile == RiderProfile::Pro && target_total_minutes > elite * REALISTIC_FACTOR {
            return judgment(
                JudgmentLevel::Info,
                "Cruising Pace",
                format!(
                    "A {} finish is a comfortable cruising pace for a professional rider.",
                    target
                ),
            );
        }

        if target_total_minutes < thresholds.min_minutes {
            return judgment(
                JudgmentLevel::Error,
                "Elite Professional Pace",
                format!(
                    "Finishing under {} requires elite professional pace. Double-check your target time.",
                    format_hours_minutes(thresholds.min_minutes)
                ),
            );
        }

        if target_total_minutes < elite {
            return judgment(
                JudgmentLevel::Warning,
                "Very Aggressive Target",
                format!(
                    "A {} finish puts you ahead of the front group's usual {}. Make sure your training supports it.",
                    target,
                    format_hours_minutes(elite)
                ),
            );
        }

        if target_total_minutes < elite * COMPETITIVE_FACTOR {
            return judgment(
                JudgmentLevel::Info,
                "Competitive Target",
                format!(
                    "A {} finish is competitive. Expect to ride hard in a fast bunch.",
                    target
                ),
            );
        }

        if target_total_minutes <= elite * REALISTIC_FACTOR {
            return judgment(
                JudgmentLevel::Success,
                "Realistic Target",
                format!(
                    "A {} finish is a realistic goal for a well-prepared rider.",
                    target
                ),
            );
        }

        judgment(
            JudgmentLevel::Info,
            "Leisurely Pace",
            format!(
                "A {} finish is a leisurely pace. Enjoy the ride and the scenery.",
                target
            ),
        )
    }
}

fn judgment(level: JudgmentLevel, title: &str, message: String) -> PaceJudgment {
    PaceJudgment {
        level,
        title: title.to_string(),
        message,
    }
}

/// Format minutes as "Hh MMm", e.g. 225 -> "3h45m"
fn format_hours_minutes(total_minutes: f64) -> String {
    let minutes = total_minutes.round().max(0.0) as u64;
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}
