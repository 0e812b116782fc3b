//! The desktop assistant's local agent sessions and the assistant CLI's prompt history.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
    utils::{text::truncate_chars, time::from_epoch_millis},
};

use super::{
    files::{find_files, read_lines, require_exists},
    transcript::TranscriptEntry,
    SourceReader,
};

const GOAL_MAX_CHARS: usize = 200;
const NO_GOAL: &str = "No user input found";
const CREATE_TOOLS: [&str; 1] = ["write_to_file"];
const MODIFY_TOOLS: [&str; 4] = [
    "Edit",
    "Replace",
    "replace_file_content",
    "multi_replace_file_content",
];
const PATH_KEYS: [&str; 4] = ["file_path", "TargetFile", "path", "AbsolutePath"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    last_activity_at: Option<i64>,
}

/// What a session's audit log says happened.
#[derive(Debug, Default, PartialEq)]
struct SessionAudit {
    interactions: usize,
    messages: Vec<String>,
    files_created: Vec<String>,
    files_modified: Vec<String>,
}

impl SessionAudit {
    fn from_lines(lines: &[String]) -> Self {
        let mut audit = SessionAudit::default();
        for line in lines {
            let Ok(entry) = serde_json::from_str::<TranscriptEntry>(line) else {
                continue;
            };
            let Some(message) = &entry.message else {
                if entry.kind.as_deref() == Some("user") {
                    audit.interactions += 1;
                }
                continue;
            };

            match entry.kind.as_deref() {
                Some("user") => {
                    audit.interactions += 1;
                    if let Some(text) = message.content.first_text().filter(|v| !v.is_empty()) {
                        audit.messages.push(text.trim().to_string());
                    }
                }
                Some("assistant") => {
                    for (name, input) in message.content.tool_uses() {
                        let Some(file) = tool_file_name(input) else {
                            continue;
                        };
                        if CREATE_TOOLS.contains(&name) {
                            audit.files_created.push(file);
                        } else if MODIFY_TOOLS.contains(&name) {
                            audit.files_modified.push(file);
                        }
                    }
                }
                _ => {}
            }
        }
        for files in [&mut audit.files_created, &mut audit.files_modified] {
            files.sort();
            files.dedup();
        }
        audit
    }
}

fn tool_file_name(input: &serde_json::Value) -> Option<String> {
    let path = PATH_KEYS
        .iter()
        .find_map(|key| input.get(key).and_then(|v| v.as_str()))
        .filter(|v| !v.is_empty())?;
    Path::new(path)
        .file_name()
        .map(|v| v.to_string_lossy().into_owned())
}

pub struct AssistantSessionReader {
    sessions_dir: PathBuf,
}

impl AssistantSessionReader {
    pub fn new(sessions_dir: PathBuf) -> Self {
        Self { sessions_dir }
    }

    async fn read_session(
        &self,
        metadata_path: &Path,
        window: &DayWindow,
    ) -> Result<Option<ActivityRecord>> {
        let content = tokio::fs::read_to_string(metadata_path).await?;
        let Ok(metadata) = serde_json::from_str::<SessionMetadata>(&content) else {
            debug!("{metadata_path:?} is not session metadata");
            return Ok(None);
        };
        let Some(last) = metadata.last_activity_at.and_then(from_epoch_millis) else {
            return Ok(None);
        };
        if !window.contains(last) {
            return Ok(None);
        }
        let created = metadata
            .created_at
            .and_then(from_epoch_millis)
            .filter(|v| *v <= last)
            .unwrap_or(last);

        let Some(stem) = metadata_path.file_stem() else {
            return Ok(None);
        };
        let audit_path = metadata_path.with_file_name(stem).join("audit.jsonl");
        if !audit_path.exists() {
            debug!("Session {metadata_path:?} has no audit log");
            return Ok(None);
        }
        let audit = SessionAudit::from_lines(&read_lines(&audit_path).await?);

        let Some((start, end)) = window.clamp(created, last) else {
            return Ok(None);
        };
        Ok(Some(ActivityRecord::between(
            start,
            end,
            Activity::CodeSession {
                title: metadata
                    .title
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| "Untitled Session".into()),
                goal: audit
                    .messages
                    .first()
                    .map(|v| truncate_chars(v, GOAL_MAX_CHARS))
                    .unwrap_or_else(|| NO_GOAL.into()),
                interactions: audit.interactions,
                duration: (last - created).max(Duration::zero()),
                files_created: audit.files_created,
                files_modified: audit.files_modified,
                messages: audit.messages,
            },
        )))
    }
}

#[async_trait]
impl SourceReader for AssistantSessionReader {
    fn source(&self) -> Source {
        Source::AssistantSessions
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        require_exists(&self.sessions_dir)?;

        let mut records = vec![];
        for path in find_files(&self.sessions_dir, "json") {
            if path.to_string_lossy().contains("todos") {
                continue;
            }
            match self.read_session(&path, window).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => debug!("Skipping session {path:?}: {e:#}"),
            }
        }
        records.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    display: String,
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

pub struct AssistantHistoryReader {
    history_file: PathBuf,
}

impl AssistantHistoryReader {
    pub fn new(history_file: PathBuf) -> Self {
        Self { history_file }
    }
}

#[async_trait]
impl SourceReader for AssistantHistoryReader {
    fn source(&self) -> Source {
        Source::AssistantCli
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        require_exists(&self.history_file)?;

        let mut records = read_lines(&self.history_file)
            .await?
            .iter()
            .filter_map(|line| serde_json::from_str::<HistoryEntry>(line).ok())
            .filter(|v| !v.display.trim().is_empty())
            .filter_map(|v| {
                let at = v.timestamp.and_then(from_epoch_millis)?;
                window.contains(at).then(|| {
                    ActivityRecord::at(
                        at,
                        Activity::Prompt {
                            text: v.display,
                            session: v.session_id,
                        },
                    )
                })
            })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(records)
    }
}
