//! Meetings of the macOS Calendar app, queried through `osascript`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveTime};
use tokio::{process::Command, time::timeout};
use tracing::{debug, instrument};

use crate::{
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
    utils::time::local_datetime,
};

use super::SourceReader;

/// Large CalDAV calendars make the Calendar app very slow to answer.
const OSASCRIPT_TIMEOUT: Duration = Duration::from_secs(200);
const ENTRY_SEPARATOR: &str = "###";
const FIELD_SEPARATOR: &str = "|||";

pub struct CalendarReader {
    calendars: Vec<String>,
    exclude_recurring: bool,
    recurring_whitelist: Vec<String>,
}

impl CalendarReader {
    pub fn new(
        calendars: Vec<String>,
        exclude_recurring: bool,
        recurring_whitelist: Vec<String>,
    ) -> Self {
        Self {
            calendars,
            exclude_recurring,
            recurring_whitelist,
        }
    }

    fn is_excluded(&self, title: &str, recurring: bool) -> bool {
        if !recurring || !self.exclude_recurring {
            return false;
        }
        let title = title.to_lowercase();
        !self
            .recurring_whitelist
            .iter()
            .any(|v| title.contains(&v.to_lowercase()))
    }

    /// Parses `title|||H:M|||H:M|||recurring|||calendar###...`. Times are of the window's day.
    fn parse_output(&self, raw: &str, window: &DayWindow) -> Vec<ActivityRecord> {
        let mut records = raw
            .split(ENTRY_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .filter_map(|entry| {
                let fields = entry.split(FIELD_SEPARATOR).map(str::trim).collect::<Vec<_>>();
                let [title, start, end, recurring, calendar, ..] = fields.as_slice() else {
                    debug!("Malformed calendar entry {entry:?}");
                    return None;
                };
                if self.is_excluded(title, recurring.eq_ignore_ascii_case("true")) {
                    return None;
                }
                let start = local_datetime(window.date(), parse_clock(start)?).ok()?;
                let end = local_datetime(window.date(), parse_clock(end)?).ok()?;
                // Meetings last at least a minute.
                let end = end.max(start + chrono::Duration::minutes(1));
                Some(ActivityRecord::between(
                    start,
                    end,
                    Activity::Meeting {
                        title: title.to_string(),
                        calendar: calendar.to_string(),
                    },
                ))
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.start.cmp(&b.start));
        records
    }

    fn script(&self, window: &DayWindow) -> String {
        let date = window.date();
        let names = self
            .calendars
            .iter()
            .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"
set dayStart to current date
set day of dayStart to 1
set year of dayStart to {year}
set month of dayStart to {month}
set day of dayStart to {day}
set hours of dayStart to 0
set minutes of dayStart to 0
set seconds of dayStart to 0
set dayEnd to dayStart + (24 * 60 * 60) - 1
set workCalNames to {{{names}}}
set output to ""
tell application "Calendar"
    repeat with calName in workCalNames
        try
            set theCalendar to calendar calName
            set theEvents to (every event of theCalendar whose start date >= dayStart and start date <= dayEnd)
            repeat with e in theEvents
                set eStart to start date of e
                set eEnd to end date of e
                set eRecur to (recurrence of e) is not ""
                if allday event of e is false then
                    set output to output & (summary of e) & "{field}" & (hours of eStart) & ":" & (minutes of eStart) & "{field}" & (hours of eEnd) & ":" & (minutes of eEnd) & "{field}" & eRecur & "{field}" & calName & "{entry}"
                end if
            end repeat
        end try
    end repeat
end tell
return output
"#,
            year = date.year(),
            month = date.month(),
            day = date.day(),
            field = FIELD_SEPARATOR,
            entry = ENTRY_SEPARATOR,
        )
    }
}

/// `H:M` as written by AppleScript, without zero padding.
fn parse_clock(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.split_once(':')?;
    NaiveTime::from_hms_opt(hours.trim().parse().ok()?, minutes.trim().parse().ok()?, 0)
}

#[async_trait]
impl SourceReader for CalendarReader {
    fn source(&self) -> Source {
        Source::Calendar
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        if self.calendars.is_empty() {
            debug!("No calendars configured");
            return Ok(vec![]);
        }
        if !cfg!(target_os = "macos") {
            bail!("Calendar is only available on macOS");
        }

        let mut command = Command::new("osascript");
        command.arg("-e").arg(self.script(window)).kill_on_drop(true);
        let output = timeout(OSASCRIPT_TIMEOUT, command.output())
            .await
            .with_context(|| format!("Calendar did not answer in {OSASCRIPT_TIMEOUT:?}"))?
            .context("Failed to run osascript")?;
        if !output.status.success() {
            bail!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(self.parse_output(&String::from_utf8_lossy(&output.stdout), window))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate};

    use crate::{
        report::{record::Activity, window::DayWindow},
        sources::SourceReader,
    };

    use super::CalendarReader;

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn titles(reader: &CalendarReader, raw: &str) -> Vec<String> {
        reader
            .parse_output(raw, &window())
            .into_iter()
            .map(|v| match v.activity {
                Activity::Meeting { title, .. } => title,
                _ => unreachable!(),
            })
            .collect()
    }

    const OUTPUT: &str = "Design review|||14:0|||15:30|||false|||Work###\
        Daily scrum|||9:30|||9:45|||true|||Work###\
        1:1 with Kim|||11:0|||11:0|||true|||Work###\
        broken entry###\n";

    #[test]
    fn test_parse_output_excludes_recurring() {
        let reader = CalendarReader::new(vec!["Work".into()], true, vec!["1:1".into()]);
        assert_eq!(titles(&reader, OUTPUT), vec!["1:1 with Kim", "Design review"]);

        let records = reader.parse_output(OUTPUT, &window());
        assert_eq!(records[0].duration(), Duration::minutes(1));
        assert_eq!(records[1].duration(), Duration::minutes(90));
        assert_eq!(records[1].start, window().at_hour(14).unwrap());
    }

    #[test]
    fn test_parse_output_keeps_recurring_when_asked() {
        let reader = CalendarReader::new(vec!["Work".into()], false, vec![]);
        assert_eq!(
            titles(&reader, OUTPUT),
            vec!["Daily scrum", "1:1 with Kim", "Design review"]
        );
    }

    #[test]
    fn test_script_escapes_names() {
        let reader = CalendarReader::new(vec!["Team \"A\"".into()], true, vec![]);
        let script = reader.script(&window());
        assert!(script.contains(r#"set workCalNames to {"Team \"A\""}"#));
        assert!(script.contains("set year of dayStart to 2026"));
    }

    #[tokio::test]
    async fn test_no_calendars_means_no_meetings() -> Result<()> {
        let reader = CalendarReader::new(vec![], true, vec![]);
        assert!(reader.read(&window()).await?.is_empty());
        Ok(())
    }
}
