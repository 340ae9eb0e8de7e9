use crate::model::Goal;
use chrono::{DateTime, Utc};

pub const CANVAS_HEIGHT: f64 = 400.0;
pub const DEFAULT_PADDING: f64 = 30.0;

const GREEN: (u8, u8, u8) = (0x00, 0xFF, 0x00);
const YELLOW: (u8, u8, u8) = (0xFF, 0xFF, 0x00);
const RED: (u8, u8, u8) = (0xFF, 0x00, 0x00);

const SECONDS_PER_DAY: f64 = 86_400.0;
const YEAR_SECONDS: i64 = 365 * 24 * 3600;
const MONTH_SECONDS: i64 = 30 * 24 * 3600;
const DAY_SECONDS: i64 = 24 * 3600;

/// Derived per tick from a goal and the clock; never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalDisplay {
    pub progress: f64,
    pub balloon_y: f64,
    pub background: (u8, u8, u8),
    pub countdown: String,
    pub overdue: bool,
}

pub fn derive(goal: &Goal, now: DateTime<Utc>) -> GoalDisplay {
    let cycle_days = goal.cycle_days();
    let progress = progress(goal.last_completed_date, cycle_days, now);
    let remaining = remaining_seconds(goal.last_completed_date, cycle_days, now);
    GoalDisplay {
        progress,
        balloon_y: balloon_y(progress, CANVAS_HEIGHT, DEFAULT_PADDING),
        background: gradient_rgb(progress),
        countdown: format_countdown(remaining),
        overdue: remaining <= 0,
    }
}

fn elapsed_seconds(last_completed: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - last_completed).num_milliseconds() as f64 / 1000.0
}

/// Fraction of the cycle elapsed, clamped to [0, 1]. A cycle of zero or
/// negative length counts as immediately complete.
pub fn progress(last_completed: DateTime<Utc>, cycle_days: f64, now: DateTime<Utc>) -> f64 {
    let total = cycle_days * SECONDS_PER_DAY;
    if total <= 0.0 {
        return 1.0;
    }
    (elapsed_seconds(last_completed, now) / total).clamp(0.0, 1.0)
}

pub fn remaining_seconds(last_completed: DateTime<Utc>, cycle_days: f64, now: DateTime<Utc>) -> i64 {
    let total = cycle_days * SECONDS_PER_DAY;
    (total - elapsed_seconds(last_completed, now)).floor() as i64
}

pub fn balloon_y(progress: f64, canvas_height: f64, padding: f64) -> f64 {
    padding + progress * (canvas_height - 2.0 * padding)
}

fn interpolate(from: (u8, u8, u8), to: (u8, u8, u8), ratio: f64) -> (u8, u8, u8) {
    let channel =
        |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * ratio).round() as u8;
    (
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

pub fn gradient_rgb(progress: f64) -> (u8, u8, u8) {
    if progress < 0.5 {
        interpolate(GREEN, YELLOW, progress / 0.5)
    } else {
        interpolate(YELLOW, RED, (progress - 0.5) / 0.5)
    }
}

pub fn gradient_hex(progress: f64) -> String {
    let (r, g, b) = gradient_rgb(progress);
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Sub-day remainders render as an HH:MM:SS clock; anything longer renders
/// as a compact token list ("2y 3d 4h"). Minutes join the token list only
/// while fewer than three tokens are present.
pub fn format_countdown(remaining_seconds: i64) -> String {
    if remaining_seconds <= 0 {
        return "Time's Up!".to_string();
    }
    let mut rest = remaining_seconds;
    let years = rest / YEAR_SECONDS;
    rest %= YEAR_SECONDS;
    let months = rest / MONTH_SECONDS;
    rest %= MONTH_SECONDS;
    let days = rest / DAY_SECONDS;
    rest %= DAY_SECONDS;
    let hours = rest / 3600;
    rest %= 3600;
    let minutes = rest / 60;
    let seconds = rest % 60;

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(format!("{}y", years));
    }
    if months > 0 {
        parts.push(format!("{}m", months));
    }
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if parts.is_empty() {
        return format!("{:02}:{:02}:{:02}", hours, minutes, seconds);
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 && parts.len() < 3 {
        parts.push(format!("{}m", minutes));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual}, diff {diff}");
    }

    #[test]
    fn progress_is_ratio_of_elapsed_to_cycle() {
        let start = at(0);
        let one_day_later = start + Duration::days(1);
        assert_close(progress(start, 2.0, one_day_later), 0.5);
    }

    #[test]
    fn progress_saturates_at_one() {
        let start = at(0);
        let much_later = start + Duration::days(10);
        assert_close(progress(start, 2.0, much_later), 1.0);
    }

    #[test]
    fn progress_clamps_future_start_to_zero() {
        let start = at(3600);
        assert_close(progress(start, 1.0, at(0)), 0.0);
    }

    #[test]
    fn degenerate_cycle_is_immediately_complete() {
        let start = at(0);
        assert_close(progress(start, 0.0, start), 1.0);
        assert_close(progress(start, -1.0, at(60)), 1.0);
    }

    #[test]
    fn progress_is_monotone_in_elapsed_time() {
        let start = at(0);
        let mut previous = 0.0;
        for hour in 0..72 {
            let p = progress(start, 2.0, start + Duration::hours(hour));
            assert!(p >= previous, "progress decreased at hour {hour}");
            previous = p;
        }
    }

    #[test]
    fn position_hits_both_endpoints() {
        assert_close(balloon_y(0.0, 400.0, 30.0), 30.0);
        assert_close(balloon_y(1.0, 400.0, 30.0), 370.0);
    }

    #[test]
    fn position_is_monotone_in_progress() {
        let mut previous = f64::MIN;
        for step in 0..=100 {
            let y = balloon_y(f64::from(step) / 100.0, 400.0, 30.0);
            assert!(y >= previous, "position decreased at step {step}");
            previous = y;
        }
    }

    #[test]
    fn gradient_endpoints_are_pure_green_and_red() {
        assert_eq!(gradient_hex(0.0), "#00FF00");
        assert_eq!(gradient_hex(1.0), "#FF0000");
    }

    #[test]
    fn gradient_is_continuous_at_the_midpoint() {
        assert_eq!(interpolate(GREEN, YELLOW, 1.0), interpolate(YELLOW, RED, 0.0));
        assert_eq!(gradient_hex(0.5), "#FFFF00");
    }

    #[test]
    fn countdown_terminal_string_for_zero_and_negative() {
        assert_eq!(format_countdown(0), "Time's Up!");
        assert_eq!(format_countdown(-1), "Time's Up!");
        assert_eq!(format_countdown(i64::MIN), "Time's Up!");
    }

    #[test]
    fn countdown_renders_sub_day_remainder_as_clock() {
        assert_eq!(format_countdown(3661), "01:01:01");
        assert_eq!(format_countdown(59), "00:00:59");
    }

    #[test]
    fn countdown_renders_long_remainder_as_tokens() {
        let two_years_three_days = 2 * YEAR_SECONDS + 3 * DAY_SECONDS;
        assert_eq!(format_countdown(two_years_three_days), "2y 3d");
    }

    #[test]
    fn countdown_appends_minutes_only_below_three_tokens() {
        // Fixed rule: hours always join; minutes only while parts < 3.
        let full = YEAR_SECONDS + 2 * MONTH_SECONDS + 3 * DAY_SECONDS + 4 * 3600 + 5 * 60;
        assert_eq!(format_countdown(full), "1y 2m 3d 4h");

        let short = 2 * DAY_SECONDS + 3 * 3600 + 4 * 60;
        assert_eq!(format_countdown(short), "2d 3h 4m");

        let no_hours = 5 * DAY_SECONDS + 30 * 60;
        assert_eq!(format_countdown(no_hours), "5d 30m");
    }

    #[test]
    fn derive_marks_elapsed_goals_overdue() {
        let goal = Goal {
            id: 1,
            name: "Water plants".into(),
            last_completed_date: at(0),
            frequency_days: 1.0,
            frequency_hours: 0.0,
            frequency_minutes: 0.0,
            image_path: None,
            audio_alert: false,
        };
        let state = derive(&goal, at(2 * DAY_SECONDS));
        assert!(state.overdue);
        assert_eq!(state.countdown, "Time's Up!");
        assert_close(state.progress, 1.0);
        assert_close(state.balloon_y, CANVAS_HEIGHT - DEFAULT_PADDING);
    }
}
