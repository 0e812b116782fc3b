//! Readers for every data source. A reader turns whatever a source stores into
//! [ActivityRecord]s of one [DayWindow]. Readers are allowed to fail; [collect] turns the failure
//! into an empty group and a warning so that one broken source never stops the report.

pub mod agent_brain;
pub mod assistant;
pub mod calendar;
pub mod cowork;
pub mod files;
pub mod git;
pub mod ide_plugin;
pub mod tracker;
pub mod transcript;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    config::Config,
    report::{
        record::{ActivityRecord, Source, SourceGroup},
        window::DayWindow,
    },
};

#[async_trait]
pub trait SourceReader: Send + Sync {
    fn source(&self) -> Source;

    /// Reads records of `window` in chronological order.
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>>;
}

/// Runs a single reader. Errors are logged and produce an empty group.
pub async fn collect(reader: &dyn SourceReader, window: &DayWindow) -> SourceGroup {
    let source = reader.source();
    match reader.read(window).await {
        Ok(records) => {
            info!("Read {} records from {source}", records.len());
            SourceGroup::new(source, records)
        }
        Err(e) => {
            warn!("Source {source} is unavailable, its section will be empty: {e:#}");
            SourceGroup::empty(source)
        }
    }
}

/// Creates every reader described by `config`, in report order.
pub fn default_readers(config: &Config) -> Result<Vec<Box<dyn SourceReader>>> {
    let api = Arc::new(tracker::HttpTrackerApi::new(&config.tracker)?);
    let sources = &config.sources;
    let min_duration = config.tracker.min_duration_seconds;

    Ok(vec![
        Box::new(tracker::WindowActivityReader::new(api.clone(), min_duration)),
        Box::new(tracker::WebActivityReader::new(api, min_duration)),
        Box::new(calendar::CalendarReader::new(
            sources.calendars.clone(),
            sources.exclude_recurring_meetings,
            sources.recurring_whitelist.clone(),
        )),
        Box::new(cowork::CoworkReader::new(sources.cowork_dir.clone())),
        Box::new(assistant::AssistantSessionReader::new(
            sources.assistant_sessions_dir.clone(),
        )),
        Box::new(assistant::AssistantHistoryReader::new(
            sources.assistant_history_file.clone(),
        )),
        Box::new(ide_plugin::IdePluginReader::new(sources.ide_plugin_dir.clone())),
        Box::new(agent_brain::AgentBrainReader::new(sources.agent_brain_dir.clone())),
        Box::new(git::GitReader::new(sources.repositories.clone())),
    ])
}
