//! Message dumps of the IDE plugin, laid out as `<dir>/<project>/latest/*.md`.

use std::{path::PathBuf, sync::OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument};

use crate::{
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
    utils::text::truncate_chars,
};

use super::{
    files::{modified_at, require_exists},
    SourceReader,
};

const QUERY_MAX_CHARS: usize = 150;

fn user_query_regex() -> &'static Regex {
    static USER_QUERY_RE: OnceLock<Regex> = OnceLock::new();
    USER_QUERY_RE.get_or_init(|| {
        Regex::new(r"(?s)<user_query>(.*?)</user_query>").expect("user query regex must compile")
    })
}

fn queries_of(dump: &str) -> Vec<String> {
    user_query_regex()
        .captures_iter(dump)
        .filter_map(|v| v.get(1))
        .map(|v| v.as_str().trim())
        .filter(|v| !v.is_empty())
        .map(|v| truncate_chars(v, QUERY_MAX_CHARS))
        .collect()
}

pub struct IdePluginReader {
    dumps_dir: PathBuf,
}

impl IdePluginReader {
    pub fn new(dumps_dir: PathBuf) -> Self {
        Self { dumps_dir }
    }

    /// Dumps as `(project, path)`, sorted.
    async fn dumps(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut dumps = vec![];
        let mut projects = tokio::fs::read_dir(&self.dumps_dir).await?;
        while let Some(project) = projects.next_entry().await? {
            let latest = project.path().join("latest");
            if !latest.is_dir() {
                continue;
            }
            let name = project.file_name().to_string_lossy().into_owned();
            let mut files = match tokio::fs::read_dir(&latest).await {
                Ok(v) => v,
                Err(e) => {
                    debug!("Skipping {latest:?}: {e}");
                    continue;
                }
            };
            while let Some(file) = files.next_entry().await.unwrap_or_else(|e| {
                debug!("Stopped listing {latest:?}: {e}");
                None
            }) {
                let path = file.path();
                if path.extension().is_some_and(|v| v == "md") {
                    dumps.push((name.clone(), path));
                }
            }
        }
        dumps.sort();
        Ok(dumps)
    }
}

#[async_trait]
impl SourceReader for IdePluginReader {
    fn source(&self) -> Source {
        Source::IdePlugin
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        require_exists(&self.dumps_dir)?;

        let mut records = vec![];
        for (project, path) in self.dumps().await? {
            let modified = match modified_at(&path).await {
                Ok(v) => v,
                Err(e) => {
                    debug!("Skipping dump: {e:#}");
                    continue;
                }
            };
            if !window.contains(modified) {
                continue;
            }
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(v) => v,
                Err(e) => {
                    debug!("Skipping dump {path:?}: {e}");
                    continue;
                }
            };
            records.extend(queries_of(&content).into_iter().map(|query| {
                ActivityRecord::at(
                    modified,
                    Activity::PluginQuery {
                        project: project.clone(),
                        query,
                    },
                )
            }));
        }
        // Stable, dumps with the same modification time keep their path order.
        records.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(records)
    }
}
