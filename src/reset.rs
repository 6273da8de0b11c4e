use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};

use crate::models::{ResetPolicy, Timestamp};

pub const WEEK_MS: Timestamp = 7 * 24 * 60 * 60 * 1000;

/// Malformed reset policy. Policies are deploy-time data, so these are
/// fatal for the category that carries them.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownWeekday(String),
    InvalidTime(String),
    InvalidDayOfMonth(u8),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownWeekday(name) => write!(f, "unknown weekday: {name}"),
            ConfigError::InvalidTime(time) => write!(f, "invalid reset time: {time}"),
            ConfigError::InvalidDayOfMonth(day) => write!(f, "invalid day of month: {day}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Next instant at which the given policy fires, strictly after `now`.
/// Pure given `now`; all calendar math is UTC.
pub fn next_reset_time(policy: &ResetPolicy, now: Timestamp) -> Result<Timestamp, ConfigError> {
    match policy {
        ResetPolicy::Daily { time } => next_daily(time, now),
        ResetPolicy::WeeklyFixedDay { time, day_of_week } => {
            next_weekly_fixed(day_of_week, time, now)
        }
        ResetPolicy::WeeklyAfterCompletion => Ok(now + WEEK_MS),
        ResetPolicy::Monthly { time, day_of_month } => next_monthly(*day_of_month, time, now),
        ResetPolicy::Unknown => next_daily("00:00", now),
    }
}

fn next_daily(time: &str, now: Timestamp) -> Result<Timestamp, ConfigError> {
    let at = parse_time(time)?;
    let mut candidate = base_date(now).and_time(at);
    if to_millis(candidate) <= now {
        candidate += Duration::days(1);
    }
    Ok(to_millis(candidate))
}

fn next_weekly_fixed(
    day_of_week: &str,
    time: &str,
    now: Timestamp,
) -> Result<Timestamp, ConfigError> {
    let target = parse_weekday(day_of_week)?;
    let at = parse_time(time)?;
    let today = base_date(now);
    let candidate = today.and_time(at);

    let mut days_until =
        (target.num_days_from_sunday() + 7 - today.weekday().num_days_from_sunday()) % 7;
    if days_until == 0 && to_millis(candidate) <= now {
        // Today's slot already passed; next week.
        days_until = 7;
    }
    Ok(to_millis(candidate + Duration::days(i64::from(days_until))))
}

fn next_monthly(day_of_month: u8, time: &str, now: Timestamp) -> Result<Timestamp, ConfigError> {
    if !(1..=31).contains(&day_of_month) {
        return Err(ConfigError::InvalidDayOfMonth(day_of_month));
    }
    let at = parse_time(time)?;
    let today = base_date(now);

    let candidate = month_day(today.year(), today.month(), day_of_month).and_time(at);
    if to_millis(candidate) > now {
        return Ok(to_millis(candidate));
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    Ok(to_millis(month_day(year, month, day_of_month).and_time(at)))
}

/// Decomposes a remaining duration into the shortest sufficient
/// day/hour/minute/second rendering ("3s", "2m 3s", "1h 0m 3s").
/// Negative input reads as nothing left.
pub fn format_remaining(ms: Timestamp) -> String {
    let total_seconds = (ms / 1000).max(0);
    let days = total_seconds / 86_400;
    let hours = total_seconds % 86_400 / 3_600;
    let minutes = total_seconds % 3_600 / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || days > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 || hours > 0 || days > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

fn base_date(now: Timestamp) -> NaiveDate {
    Utc.timestamp_millis_opt(now)
        .single()
        .unwrap_or_else(Utc::now)
        .date_naive()
}

fn to_millis(dt: NaiveDateTime) -> Timestamp {
    dt.and_utc().timestamp_millis()
}

fn parse_time(time: &str) -> Result<NaiveTime, ConfigError> {
    let invalid = || ConfigError::InvalidTime(time.to_string());
    let (hours, minutes) = time.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

fn parse_weekday(name: &str) -> Result<Weekday, ConfigError> {
    match name {
        "Sunday" => Ok(Weekday::Sun),
        "Monday" => Ok(Weekday::Mon),
        "Tuesday" => Ok(Weekday::Tue),
        "Wednesday" => Ok(Weekday::Wed),
        "Thursday" => Ok(Weekday::Thu),
        "Friday" => Ok(Weekday::Fri),
        "Saturday" => Ok(Weekday::Sat),
        other => Err(ConfigError::UnknownWeekday(other.to_string())),
    }
}

/// Months shorter than `day` clamp to their last day instead of rolling
/// into the following month.
fn month_day(year: i32, month: u32, day: u8) -> NaiveDate {
    let day = u32::from(day).min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default())
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_next) => (first_next - Duration::days(1)).day(),
        None => 28,
    }
}
