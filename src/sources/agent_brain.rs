use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::report::{
    record::{Activity, ActivityRecord, Source},
    window::DayWindow,
};

use super::{
    files::{modified_at, require_exists},
    SourceReader,
};

const OBJECTIVE_MARKER: &str = "USER Objective:";
const MIN_OBJECTIVE_CHARS: usize = 6;
pub const MAX_OBJECTIVES: usize = 10;

/// The line after the objective marker.
fn objective_of(overview: &str) -> Option<&str> {
    let mut lines = overview.lines();
    lines.find(|v| v.contains(OBJECTIVE_MARKER))?;
    lines
        .next()
        .map(str::trim)
        .filter(|v| v.chars().count() >= MIN_OBJECTIVE_CHARS)
}

fn overview_path(conversation: &Path) -> PathBuf {
    conversation
        .join(".system_generated")
        .join("logs")
        .join("overview.txt")
}

/// Objectives of coding agent conversations touched during the day.
pub struct AgentBrainReader {
    brain_dir: PathBuf,
}

impl AgentBrainReader {
    pub fn new(brain_dir: PathBuf) -> Self {
        Self { brain_dir }
    }
}

#[async_trait]
impl SourceReader for AgentBrainReader {
    fn source(&self) -> Source {
        Source::AgentBrain
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        require_exists(&self.brain_dir)?;

        let mut entries = tokio::fs::read_dir(&self.brain_dir).await?;
        let mut records = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let conversation = entry.path();
            if !entry.file_type().await.is_ok_and(|v| v.is_dir()) {
                continue;
            }
            let modified = match modified_at(&conversation).await {
                Ok(v) => v,
                Err(e) => {
                    debug!("Skipping conversation: {e:#}");
                    continue;
                }
            };
            if !window.contains(modified) {
                continue;
            }
            let Ok(overview) = tokio::fs::read_to_string(overview_path(&conversation)).await else {
                debug!("{conversation:?} has no overview");
                continue;
            };
            if let Some(objective) = objective_of(&overview) {
                records.push(ActivityRecord::at(
                    modified,
                    Activity::Prompt {
                        text: objective.to_string(),
                        session: entry.file_name().to_str().map(str::to_string),
                    },
                ));
            }
        }
        records.sort_by(|a, b| a.start.cmp(&b.start));
        records.truncate(MAX_OBJECTIVES);
        Ok(records)
    }
}
