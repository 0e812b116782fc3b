//! Cowork transcripts. Messages of the day are grouped into tasks: a user message and the
//! assistant replies that follow it.

use std::{
    path::PathBuf,
    sync::OnceLock,
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
    utils::text::truncate_chars,
};

use super::{
    files::{find_files, read_lines, require_exists},
    transcript::TranscriptEntry,
    SourceReader,
};

const INTENT_MAX_CHARS: usize = 100;
const RESULT_MAX_CHARS: usize = 80;
const MAX_URLS: usize = 3;
/// Intents this short without URLs are follow-ups of the previous task.
const FOLLOW_UP_MAX_CHARS: usize = 10;

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s\)\]>"]+"#).expect("url regex must compile")
    })
}

fn markdown_prefix_regex() -> &'static Regex {
    static MARKDOWN_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    MARKDOWN_PREFIX_RE
        .get_or_init(|| Regex::new(r"^[#*>\-\s]+").expect("markdown prefix regex must compile"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
struct Message {
    at: DateTime<Local>,
    role: Role,
    text: String,
}

fn parse_message(line: &str, window: &DayWindow) -> Option<Message> {
    let entry = serde_json::from_str::<TranscriptEntry>(line).ok()?;
    if entry.is_meta {
        return None;
    }
    let at = DateTime::parse_from_rfc3339(entry.timestamp.as_deref()?)
        .ok()?
        .with_timezone(&Local);
    if !window.contains(at) {
        return None;
    }
    let message = entry.message?;
    let role = match message.role.as_deref()? {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };
    let text = message.content.joined_text().trim().to_string();
    if text.chars().count() < 2 {
        return None;
    }
    Some(Message { at, role, text })
}

/// Up to [MAX_URLS] urls found in `text`, one per host.
fn collect_urls(text: &str, urls: &mut Vec<String>) {
    for found in url_regex().find_iter(text) {
        if urls.len() >= MAX_URLS {
            return;
        }
        let Some(host) = Url::parse(found.as_str())
            .ok()
            .and_then(|v| v.host_str().map(str::to_string))
        else {
            continue;
        };
        let duplicate = urls
            .iter()
            .filter_map(|v| Url::parse(v).ok())
            .any(|v| v.host_str() == Some(host.as_str()));
        if !duplicate {
            urls.push(found.as_str().to_string());
        }
    }
}

fn result_line(reply: &str) -> String {
    let first = reply.lines().next().unwrap_or_default().trim();
    let first = markdown_prefix_regex().replace(first, "");
    truncate_chars(&first, RESULT_MAX_CHARS)
}

/// Groups chronologically ordered messages into tasks. Assistant messages before the first user
/// message are ignored.
fn group_tasks(messages: &[Message]) -> Vec<ActivityRecord> {
    let mut tasks: Vec<ActivityRecord> = vec![];
    let mut index = 0;
    while index < messages.len() {
        let message = &messages[index];
        index += 1;
        if message.role != Role::User {
            continue;
        }

        let mut result = String::new();
        let mut urls = vec![];
        while let Some(reply) = messages.get(index).filter(|v| v.role == Role::Assistant) {
            collect_urls(&reply.text, &mut urls);
            if result.is_empty() {
                result = result_line(&reply.text);
            }
            index += 1;
        }

        let intent = truncate_chars(&message.text, INTENT_MAX_CHARS);
        if !tasks.is_empty() && intent.chars().count() <= FOLLOW_UP_MAX_CHARS && urls.is_empty() {
            debug!("Folding follow-up {intent:?} into the previous task");
            continue;
        }
        tasks.push(ActivityRecord::at(
            message.at,
            Activity::AssistantTask {
                intent,
                result,
                urls,
            },
        ));
    }
    tasks
}

pub struct CoworkReader {
    log_dir: Option<PathBuf>,
}

impl CoworkReader {
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self { log_dir }
    }
}

#[async_trait]
impl SourceReader for CoworkReader {
    fn source(&self) -> Source {
        Source::AssistantCowork
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        let Some(log_dir) = &self.log_dir else {
            debug!("Cowork is not configured");
            return Ok(vec![]);
        };
        require_exists(log_dir)?;

        let mut messages = vec![];
        for path in find_files(log_dir, "jsonl") {
            match read_lines(&path).await {
                Ok(lines) => {
                    messages.extend(lines.iter().filter_map(|v| parse_message(v, window)))
                }
                Err(e) => debug!("Skipping transcript {path:?}: {e:#}"),
            }
        }
        messages.sort_by(|a, b| a.at.cmp(&b.at));
        Ok(group_tasks(&messages))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate, SecondsFormat, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        report::{record::Activity, window::DayWindow},
        sources::SourceReader,
    };

    use super::{collect_urls, result_line, CoworkReader};

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn row(window: &DayWindow, minute: i64, role: &str, content: serde_json::Value) -> String {
        let at = (window.start() + Duration::minutes(minute))
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        json!({"type": role, "timestamp": at, "message": {"role": role, "content": content}})
            .to_string()
    }

    #[test]
    fn test_collect_urls_keeps_one_per_host() {
        let mut urls = vec![];
        collect_urls(
            "See https://docs.rs/a, https://docs.rs/b and (https://github.com/x) \
             https://crates.io/c https://example.com/d",
            &mut urls,
        );
        assert_eq!(
            urls,
            vec![
                "https://docs.rs/a,",
                "https://github.com/x",
                "https://crates.io/c"
            ]
        );
    }

    #[test]
    fn test_result_line_strips_markdown() {
        assert_eq!(result_line("## Done: added tests\nmore"), "Done: added tests");
        assert_eq!(result_line("> - quoted"), "quoted");
    }

    #[tokio::test]
    async fn test_reader_groups_tasks() -> Result<()> {
        let dir = tempdir()?;
        let window = window();
        let lines = [
            row(&window, 60, "user", json!("Summarize the release notes for 1.4")),
            row(
                &window,
                61,
                "assistant",
                json!([{"type": "text", "text": "**Release 1.4** adds sync.\nSource: https://example.com/notes"}]),
            ),
            row(&window, 62, "assistant", json!("Also https://example.com/other")),
            row(&window, 63, "user", json!("thanks")),
            row(&window, 64, "assistant", json!("You're welcome")),
            row(&window, 65, "user", json!("x")),
            row(&window, -30, "user", json!("Yesterday's question")),
            json!({"isMeta": true, "timestamp": "2026-02-10T05:00:00Z",
                   "message": {"role": "user", "content": "meta"}})
            .to_string(),
        ];
        fs::create_dir_all(dir.path().join("project"))?;
        fs::write(dir.path().join("project/session.jsonl"), lines.join("\n"))?;

        let reader = CoworkReader::new(Some(dir.path().to_path_buf()));
        let records = reader.read(&window).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].activity,
            Activity::AssistantTask {
                intent: "Summarize the release notes for 1.4".into(),
                result: "Release 1.4** adds sync.".into(),
                urls: vec!["https://example.com/notes".into()],
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unconfigured_reader_is_empty() -> Result<()> {
        assert!(CoworkReader::new(None).read(&window()).await?.is_empty());
        Ok(())
    }
}
