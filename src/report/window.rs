use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime};

use crate::utils::time::{local_datetime, local_midnight};

/// The `[start, end)` local interval of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    start: DateTime<Local>,
    end: DateTime<Local>,
}

impl DayWindow {
    pub fn new(date: NaiveDate) -> Result<Self> {
        let next = date
            .succ_opt()
            .with_context(|| format!("{date} has no following day"))?;
        Ok(Self {
            date,
            start: local_midnight(date)?,
            end: local_midnight(next)?,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> DateTime<Local> {
        self.start
    }

    pub fn end(&self) -> DateTime<Local> {
        self.end
    }

    pub fn contains(&self, moment: DateTime<Local>) -> bool {
        self.start <= moment && moment < self.end
    }

    /// Cuts `[start, end)` down to the window. Returns None when nothing is left.
    pub fn clamp(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Option<(DateTime<Local>, DateTime<Local>)> {
        let start = start.max(self.start);
        let end = end.min(self.end);
        if start < end || (start == end && self.contains(start)) {
            Some((start, end))
        } else {
            None
        }
    }

    /// Moment `hour:00` of the window's day. Hour 24 is the end of the window.
    pub fn at_hour(&self, hour: u32) -> Option<DateTime<Local>> {
        if hour >= 24 {
            return Some(self.end);
        }
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        local_datetime(self.date, time).ok()
    }
}
