//! The day-shaped data model. Readers produce [SourceGroup]s, [aggregate] folds them into a
//! [DailyReport] that the formatters consume.

pub mod analysis;
pub mod record;
pub mod window;

use record::{ActivityRecord, Source, SourceGroup};
use tracing::warn;
use window::DayWindow;

/// All records observed for one [DayWindow], one group per [Source] in [Source::ALL] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    window: DayWindow,
    groups: Vec<SourceGroup>,
}

impl DailyReport {
    pub fn window(&self) -> &DayWindow {
        &self.window
    }

    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    pub fn records(&self, source: Source) -> &[ActivityRecord] {
        self.groups
            .iter()
            .find(|v| v.source == source)
            .map(|v| v.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|v| v.records.len()).sum()
    }
}

/// Concatenates groups per source keeping the order they were read in. Records stamped outside
/// of the window are dropped.
pub fn aggregate(window: DayWindow, groups: Vec<SourceGroup>) -> DailyReport {
    let mut merged = Source::ALL.map(SourceGroup::empty).to_vec();

    for group in groups {
        let Some(target) = merged.iter_mut().find(|v| v.source == group.source) else {
            continue;
        };
        for record in group.records {
            if window.contains(record.start) {
                target.records.push(record);
            } else {
                warn!(
                    "Dropping {} record outside of {}: {:?}",
                    group.source,
                    window.date(),
                    record
                );
            }
        }
    }

    DailyReport {
        window,
        groups: merged,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{
        aggregate,
        record::{Activity, ActivityRecord, Source, SourceGroup},
        window::DayWindow,
    };

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn prompt(window: &DayWindow, minutes: i64, text: &str) -> ActivityRecord {
        ActivityRecord::at(
            window.start() + Duration::minutes(minutes),
            Activity::Prompt {
                text: text.into(),
                session: None,
            },
        )
    }

    #[test]
    fn test_aggregate_keeps_every_source_in_order() {
        let window = window();
        let report = aggregate(window, vec![]);
        let sources = report.groups().iter().map(|v| v.source).collect::<Vec<_>>();
        assert_eq!(sources, Source::ALL.to_vec());
        assert_eq!(report.record_count(), 0);
    }

    #[test]
    fn test_aggregate_concatenates_without_reordering() {
        let window = window();
        let report = aggregate(
            window,
            vec![
                SourceGroup::new(
                    Source::AssistantCli,
                    vec![prompt(&window, 50, "b"), prompt(&window, 10, "a")],
                ),
                SourceGroup::new(Source::AssistantCli, vec![prompt(&window, 5, "c")]),
                SourceGroup::new(Source::AgentBrain, vec![prompt(&window, 1, "x")]),
            ],
        );
        let texts = report
            .records(Source::AssistantCli)
            .iter()
            .map(|v| match &v.activity {
                Activity::Prompt { text, .. } => text.as_str(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["b", "a", "c"]);
        assert_eq!(report.records(Source::AgentBrain).len(), 1);
    }

    #[test]
    fn test_aggregate_drops_records_outside_window() {
        let window = window();
        let report = aggregate(
            window,
            vec![SourceGroup::new(
                Source::AssistantCli,
                vec![
                    prompt(&window, -1, "yesterday"),
                    prompt(&window, 60 * 24, "tomorrow"),
                    prompt(&window, 0, "midnight"),
                ],
            )],
        );
        assert_eq!(report.records(Source::AssistantCli).len(), 1);
    }
}
