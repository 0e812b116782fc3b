use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};

/// This is the standard way of converting a date to a string in dayrecap.
pub fn date_to_report_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns local midnight of `date`. Fails for dates whose midnight is skipped by a DST
/// transition in the local timezone.
pub fn local_midnight(date: NaiveDate) -> Result<DateTime<Local>> {
    local_datetime(date, NaiveTime::MIN)
}

pub fn local_datetime(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| anyhow!("{} {} does not exist in the local timezone", date, time))
}

pub fn from_epoch_millis(ms: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(ms).map(|v| v.with_timezone(&Local))
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!("{}h {}m", v.num_hours(), v.num_minutes() % 60)
    } else if v.num_minutes() > 0 {
        format!("{}m", v.num_minutes())
    } else {
        format!("{}s", v.num_seconds().max(0))
    }
}
