use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::{process::Command, time::timeout};
use tracing::{debug, instrument, warn};

use crate::{
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
    utils::time::from_epoch_millis,
};

use super::SourceReader;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_COMMITS: usize = 10;
pub const MAX_FILES: usize = 20;

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Debug, PartialEq)]
struct GitCommit {
    at: DateTime<Local>,
    subject: String,
    files: Vec<String>,
}

/// Parses `git log --name-only --pretty=format:%x1e%H%x1f%ct%x1f%s`.
fn parse_log(raw: &str) -> Vec<GitCommit> {
    raw.split(RECORD_SEPARATOR)
        .filter_map(|chunk| {
            let mut lines = chunk.lines();
            let header = lines.next()?;
            let mut fields = header.split(FIELD_SEPARATOR);
            let _hash = fields.next()?;
            let seconds = fields.next()?.trim().parse::<i64>().ok()?;
            let subject = fields.next().unwrap_or_default().trim().to_string();
            let files = lines
                .map(str::trim)
                .filter(|v| !v.is_empty() && (v.contains('/') || v.contains('.')))
                .map(str::to_string)
                .collect();
            Some(GitCommit {
                at: from_epoch_millis(seconds * 1000)?,
                subject,
                files,
            })
        })
        .collect()
}

fn repository_name(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Turns commits of every repository into records: the [MAX_COMMITS] latest commits and the
/// first [MAX_FILES] changed files by path, each file dated by its earliest commit.
fn to_records(commits: Vec<(String, GitCommit)>, window: &DayWindow) -> Vec<ActivityRecord> {
    let mut commits = commits
        .into_iter()
        .filter(|(_, v)| window.contains(v.at))
        .collect::<Vec<_>>();
    commits.sort_by(|a, b| a.1.at.cmp(&b.1.at));

    let mut files = BTreeMap::<(String, String), DateTime<Local>>::new();
    for (repository, commit) in &commits {
        for file in &commit.files {
            files
                .entry((repository.clone(), file.clone()))
                .and_modify(|v| *v = (*v).min(commit.at))
                .or_insert(commit.at);
        }
    }

    let skip = commits.len().saturating_sub(MAX_COMMITS);
    let mut records = commits
        .into_iter()
        .skip(skip)
        .map(|(repository, commit)| {
            ActivityRecord::at(
                commit.at,
                Activity::Commit {
                    repository,
                    subject: commit.subject,
                },
            )
        })
        .chain(
            files
                .into_iter()
                .take(MAX_FILES)
                .map(|((repository, path), at)| {
                    ActivityRecord::at(at, Activity::FileEdit { repository, path })
                }),
        )
        .collect::<Vec<_>>();
    // Stable, so commits stay ahead of the files they touched.
    records.sort_by(|a, b| a.start.cmp(&b.start));
    records
}

/// Commits and changed files of the configured repositories.
pub struct GitReader {
    repositories: Vec<PathBuf>,
}

impl GitReader {
    pub fn new(repositories: Vec<PathBuf>) -> Self {
        Self { repositories }
    }

    async fn log(&self, repository: &Path, window: &DayWindow) -> Result<Vec<GitCommit>> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(repository)
            .arg("log")
            .arg(format!("--since={}", window.start().to_rfc3339()))
            .arg(format!("--until={}", window.end().to_rfc3339()))
            .arg("--name-only")
            .arg("--pretty=format:%x1e%H%x1f%ct%x1f%s")
            .kill_on_drop(true);

        let output = timeout(GIT_TIMEOUT, command.output())
            .await
            .context("git log timed out")?
            .context("Failed to run git")?;
        if !output.status.success() {
            bail!(
                "git log failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl SourceReader for GitReader {
    fn source(&self) -> Source {
        Source::Git
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        let mut commits = vec![];
        for repository in &self.repositories {
            if !repository.is_dir() {
                warn!("Repository {repository:?} does not exist");
                continue;
            }
            match self.log(repository, window).await {
                Ok(found) => {
                    debug!("{} commits in {repository:?}", found.len());
                    let name = repository_name(repository);
                    commits.extend(found.into_iter().map(|v| (name.clone(), v)));
                }
                Err(e) => warn!("Skipping repository {repository:?}: {e:#}"),
            }
        }
        Ok(to_records(commits, window))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;
    use chrono::{Duration, NaiveDate};

    use crate::{
        report::{record::Activity, window::DayWindow},
        sources::SourceReader,
        utils::logging::TEST_LOGGING,
    };

    use super::{parse_log, repository_name, to_records, GitReader, MAX_COMMITS};

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn log_entry(window: &DayWindow, minute: i64, subject: &str, files: &[&str]) -> String {
        let seconds = (window.start() + Duration::minutes(minute)).timestamp();
        format!(
            "\u{1e}abc123\u{1f}{seconds}\u{1f}{subject}\n{}\n",
            files.join("\n")
        )
    }

    #[test]
    fn test_parse_log() {
        let window = window();
        let raw = [
            log_entry(&window, 120, "Add parser", &["src/parser.rs", "Makefile", "README.md"]),
            log_entry(&window, 60, "Initial commit", &[]),
        ]
        .concat();
        let commits = parse_log(&raw);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "Add parser");
        // Names without a dot or a slash are not treated as files.
        assert_eq!(commits[0].files, vec!["src/parser.rs", "README.md"]);
        assert_eq!(commits[1].at, window.start() + Duration::hours(1));
        assert!(commits[1].files.is_empty());
    }

    #[test]
    fn test_records_are_limited_and_chronological() {
        let window = window();
        let raw = (0..12)
            .rev()
            .map(|i| log_entry(&window, 60 + i, &format!("commit {i}"), &["src/lib.rs"]))
            .collect::<String>();
        let commits = parse_log(&raw)
            .into_iter()
            .map(|v| ("repo".to_string(), v))
            .collect();

        let records = to_records(commits, &window);
        let subjects = records
            .iter()
            .filter_map(|v| match &v.activity {
                Activity::Commit { subject, .. } => Some(subject.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(subjects.len(), MAX_COMMITS);
        assert_eq!(subjects.first(), Some(&"commit 2"));
        assert_eq!(subjects.last(), Some(&"commit 11"));

        let files = records
            .iter()
            .filter(|v| matches!(v.activity, Activity::FileEdit { .. }))
            .collect::<Vec<_>>();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].start, window.start() + Duration::minutes(60));
        assert!(records.windows(2).all(|v| v[0].start <= v[1].start));
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name(Path::new("/home/me/daily-summary-env")), "daily-summary-env");
    }

    #[tokio::test]
    async fn test_missing_repositories_are_skipped() -> Result<()> {
        *TEST_LOGGING;
        let reader = GitReader::new(vec!["/does/not/exist".into()]);
        assert!(reader.read(&window()).await?.is_empty());
        Ok(())
    }
}
