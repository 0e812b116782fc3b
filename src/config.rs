//! Configuration is read from an optional TOML file. Every field has a default so an empty or
//! missing file is valid. Secrets are taken from the environment first (a `.env` file in the
//! working directory is loaded into it) and from the file second.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::utils::dir::{default_config_path, expand_home, home_dir};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const WEBHOOK_URL_VAR: &str = "SLACK_WEBHOOK_URL";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub report: ReportConfig,
    pub sources: SourcesConfig,
    pub summary: SummaryConfig,
    pub notify: NotifyConfig,
    /// Additional days off honoured by `--skip-holidays`.
    pub holidays: Vec<NaiveDate>,
}

/// Connection to the local ActivityWatch server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
    /// Events not longer than this are ignored.
    pub min_duration_seconds: f64,
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5600,
            min_duration_seconds: 10.,
            timeout_secs: 10,
        }
    }
}

impl TrackerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api/0", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub top_apps: usize,
    pub top_domains: usize,
    /// Hour ranges in 24h format, end exclusive.
    pub productive_hours: Vec<(u32, u32)>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("~/daily-summaries"),
            top_apps: 3,
            top_domains: 3,
            productive_hours: vec![(9, 12), (14, 18)],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub assistant_sessions_dir: PathBuf,
    pub assistant_history_file: PathBuf,
    /// Cowork transcripts are skipped when unset.
    pub cowork_dir: Option<PathBuf>,
    pub agent_brain_dir: PathBuf,
    pub ide_plugin_dir: PathBuf,
    pub repositories: Vec<PathBuf>,
    /// Calendar names to read meetings from. Meetings are skipped when empty.
    pub calendars: Vec<String>,
    pub exclude_recurring_meetings: bool,
    /// Recurring meetings whose title contains one of these are kept anyway.
    pub recurring_whitelist: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            assistant_sessions_dir: PathBuf::from(
                "~/Library/Application Support/Claude/local-agent-mode-sessions",
            ),
            assistant_history_file: PathBuf::from("~/.claude/history.jsonl"),
            cowork_dir: Some(PathBuf::from("~/Library/Application Support/Claude/projects")),
            agent_brain_dir: PathBuf::from("~/.gemini/antigravity/brain"),
            ide_plugin_dir: PathBuf::from("~/.firebender/message-dumps"),
            repositories: vec![PathBuf::from("~/daily-summary-env")],
            calendars: vec![],
            exclude_recurring_meetings: true,
            recurring_whitelist: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Upper bound on how much of the document is sent to the model.
    pub max_excerpt_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            max_excerpt_chars: 30_000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Loads `path` if given, otherwise the default location when it exists, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = default_config_path()?;
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    debug!("No config at {path:?}, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_secrets(|name| std::env::var(name).ok());
        config.expand_paths(&home_dir()?);
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment values win over the file. Blank values count as missing.
    pub fn apply_secrets(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |env: Option<String>, file: Option<String>| {
            env.filter(|v| !v.trim().is_empty())
                .or(file.filter(|v| !v.trim().is_empty()))
        };
        self.summary.api_key = pick(lookup(API_KEY_VAR), self.summary.api_key.take());
        self.notify.webhook_url = pick(lookup(WEBHOOK_URL_VAR), self.notify.webhook_url.take());
    }

    pub fn expand_paths(&mut self, home: &Path) {
        let sources = &mut self.sources;
        self.report.output_dir = expand_home(&self.report.output_dir, home);
        sources.assistant_sessions_dir = expand_home(&sources.assistant_sessions_dir, home);
        sources.assistant_history_file = expand_home(&sources.assistant_history_file, home);
        sources.cowork_dir = sources.cowork_dir.as_deref().map(|v| expand_home(v, home));
        sources.agent_brain_dir = expand_home(&sources.agent_brain_dir, home);
        sources.ide_plugin_dir = expand_home(&sources.ide_plugin_dir, home);
        for repository in sources.repositories.iter_mut() {
            *repository = expand_home(repository, home);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::Path};

    use anyhow::Result;
    use chrono::NaiveDate;

    use super::{Config, API_KEY_VAR, WEBHOOK_URL_VAR};

    #[test]
    fn test_empty_config_uses_defaults() -> Result<()> {
        let config = Config::parse("")?;
        assert_eq!(config.tracker.port, 5600);
        assert_eq!(config.report.productive_hours, vec![(9, 12), (14, 18)]);
        assert_eq!(config.summary.model, "gemini-2.5-flash");
        assert!(config.sources.calendars.is_empty());
        Ok(())
    }

    #[test]
    fn test_partial_config() -> Result<()> {
        let config = Config::parse(
            r#"
            holidays = ["2026-03-03"]

            [tracker]
            port = 5666

            [report]
            output_dir = "/tmp/reports"
            productive_hours = [[8, 11]]

            [sources]
            repositories = ["~/work/a", "/srv/b"]
            calendars = ["Work"]
            "#,
        )?;
        assert_eq!(config.tracker.port, 5666);
        assert_eq!(config.tracker.host, "127.0.0.1");
        assert_eq!(config.report.productive_hours, vec![(8, 11)]);
        assert_eq!(config.sources.calendars, vec!["Work".to_string()]);
        assert_eq!(config.holidays, vec![NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()]);
        assert_eq!(config.tracker.base_url(), "http://127.0.0.1:5666/api/0");
        Ok(())
    }

    #[test]
    fn test_secrets_prefer_environment() -> Result<()> {
        let mut config = Config::parse(
            r#"
            [summary]
            api_key = "from-file"
            [notify]
            webhook_url = "https://hooks.example/file"
            "#,
        )?;
        let env = HashMap::from([(API_KEY_VAR, "from-env"), (WEBHOOK_URL_VAR, "  ")]);
        config.apply_secrets(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.summary.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.notify.webhook_url.as_deref(),
            Some("https://hooks.example/file")
        );
        Ok(())
    }

    #[test]
    fn test_expand_paths() -> Result<()> {
        let mut config = Config::parse("[sources]\nrepositories = [\"~/repo\"]")?;
        config.expand_paths(Path::new("/home/me"));
        assert_eq!(config.report.output_dir, Path::new("/home/me/daily-summaries"));
        assert_eq!(config.sources.repositories[0], Path::new("/home/me/repo"));
        assert_eq!(
            config.sources.ide_plugin_dir,
            Path::new("/home/me/.firebender/message-dumps")
        );
        Ok(())
    }
}
