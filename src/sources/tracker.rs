//! ActivityWatch. Window events come from the `currentwindow` bucket, web events from every
//! `web.tab.current` bucket (one per browser).

use std::{collections::BTreeMap, sync::Arc, time::Duration as StdDuration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{
    config::TrackerConfig,
    report::{
        record::{Activity, ActivityRecord, Source},
        window::DayWindow,
    },
};

use super::SourceReader;

pub const WINDOW_BUCKET_TYPE: &str = "currentwindow";
pub const WEB_BUCKET_TYPE: &str = "web.tab.current";

/// Window owner reported while the screen is locked.
const LOCK_SCREEN_APP: &str = "loginwindow";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BucketInfo {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrackerEvent {
    pub timestamp: DateTime<Utc>,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TrackerEvent {
    fn text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Event interval clamped to the window. `None` also for durations that don't fit a date.
    fn span(&self, window: &DayWindow) -> Option<(DateTime<Local>, DateTime<Local>)> {
        let start = self.timestamp.with_timezone(&Local);
        let length = Duration::try_milliseconds((self.duration * 1000.) as i64)?;
        let end = start.checked_add_signed(length)?;
        window.clamp(start, end)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn buckets(&self) -> Result<BTreeMap<String, BucketInfo>>;

    async fn events(&self, bucket_id: &str, window: &DayWindow) -> Result<Vec<TrackerEvent>>;
}

pub struct HttpTrackerApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTrackerApi {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn buckets(&self) -> Result<BTreeMap<String, BucketInfo>> {
        // The trailing slash is required by the server.
        let url = format!("{}/buckets/", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("ActivityWatch is not reachable at {}", self.base_url))?;
        if !response.status().is_success() {
            bail!("Listing buckets failed with status {}", response.status());
        }
        Ok(response.json().await?)
    }

    async fn events(&self, bucket_id: &str, window: &DayWindow) -> Result<Vec<TrackerEvent>> {
        let url = format!("{}/buckets/{bucket_id}/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", window.start().to_rfc3339()),
                ("end", window.end().to_rfc3339()),
                ("limit", "-1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "Fetching events of {bucket_id} failed with status {}",
                response.status()
            );
        }
        Ok(response.json().await?)
    }
}

fn buckets_of_type(buckets: &BTreeMap<String, BucketInfo>, kind: &str) -> Vec<String> {
    buckets
        .iter()
        .filter(|(_, v)| v.kind == kind)
        .map(|(id, _)| id.clone())
        .collect()
}

fn sort_chronologically(records: &mut [ActivityRecord]) {
    records.sort_by(|a, b| a.start.cmp(&b.start));
}

/// Foreground application usage.
pub struct WindowActivityReader {
    api: Arc<dyn TrackerApi>,
    min_duration_seconds: f64,
}

impl WindowActivityReader {
    pub fn new(api: Arc<dyn TrackerApi>, min_duration_seconds: f64) -> Self {
        Self {
            api,
            min_duration_seconds,
        }
    }

    fn to_record(&self, event: &TrackerEvent, window: &DayWindow) -> Option<ActivityRecord> {
        let app = event.text("app")?;
        if app.eq_ignore_ascii_case(LOCK_SCREEN_APP) || event.duration <= self.min_duration_seconds
        {
            return None;
        }
        let (start, end) = event.span(window)?;
        Some(ActivityRecord::between(
            start,
            end,
            Activity::AppUsage {
                app: app.to_string(),
                title: event.text("title").unwrap_or_default().to_string(),
            },
        ))
    }
}

#[async_trait]
impl SourceReader for WindowActivityReader {
    fn source(&self) -> Source {
        Source::TrackerWindows
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        let buckets = self.api.buckets().await?;
        let Some(bucket_id) = buckets_of_type(&buckets, WINDOW_BUCKET_TYPE).into_iter().next()
        else {
            bail!("No {WINDOW_BUCKET_TYPE} bucket found");
        };
        debug!("Reading window events from {bucket_id}");

        let events = self.api.events(&bucket_id, window).await?;
        let mut records = events
            .iter()
            .filter_map(|v| self.to_record(v, window))
            .collect::<Vec<_>>();
        sort_chronologically(&mut records);
        Ok(records)
    }
}

/// Browser tabs.
pub struct WebActivityReader {
    api: Arc<dyn TrackerApi>,
    min_duration_seconds: f64,
}

impl WebActivityReader {
    pub fn new(api: Arc<dyn TrackerApi>, min_duration_seconds: f64) -> Self {
        Self {
            api,
            min_duration_seconds,
        }
    }

    fn to_record(&self, event: &TrackerEvent, window: &DayWindow) -> Option<ActivityRecord> {
        let url = event.text("url").filter(|v| !v.is_empty())?;
        if event.duration <= self.min_duration_seconds {
            return None;
        }
        let (start, end) = event.span(window)?;
        Some(ActivityRecord::between(
            start,
            end,
            Activity::WebVisit {
                url: url.to_string(),
                domain: domain_of(url),
                title: event.text("title").unwrap_or_default().to_string(),
            },
        ))
    }
}

/// Host of `url` with its explicit port, or the url itself when it has no host.
pub fn domain_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match (parsed.host_str().filter(|v| !v.is_empty()), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => url.to_string(),
    }
}

#[async_trait]
impl SourceReader for WebActivityReader {
    fn source(&self) -> Source {
        Source::TrackerWeb
    }

    #[instrument(skip_all, fields(date = %window.date()))]
    async fn read(&self, window: &DayWindow) -> Result<Vec<ActivityRecord>> {
        let buckets = self.api.buckets().await?;
        let bucket_ids = buckets_of_type(&buckets, WEB_BUCKET_TYPE);
        if bucket_ids.is_empty() {
            bail!("No {WEB_BUCKET_TYPE} bucket found");
        }

        let mut records = vec![];
        for bucket_id in bucket_ids {
            match self.api.events(&bucket_id, window).await {
                Ok(events) => {
                    records.extend(events.iter().filter_map(|v| self.to_record(v, window)))
                }
                Err(e) => warn!("Skipping web bucket {bucket_id}: {e:#}"),
            }
        }
        sort_chronologically(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use anyhow::{anyhow, Result};
    use chrono::{Duration, NaiveDate, Utc};
    use mockall::predicate::eq;
    use serde_json::json;

    use crate::{
        report::{record::Activity, window::DayWindow},
        sources::SourceReader,
        utils::logging::TEST_LOGGING,
    };

    use super::{
        domain_of, BucketInfo, MockTrackerApi, TrackerEvent, WebActivityReader,
        WindowActivityReader,
    };

    fn window() -> DayWindow {
        DayWindow::new(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()).unwrap()
    }

    fn buckets() -> BTreeMap<String, BucketInfo> {
        BTreeMap::from([
            (
                "aw-watcher-window_host".to_string(),
                BucketInfo {
                    kind: "currentwindow".into(),
                },
            ),
            (
                "aw-watcher-afk_host".to_string(),
                BucketInfo {
                    kind: "afkstatus".into(),
                },
            ),
            (
                "aw-watcher-web-chrome".to_string(),
                BucketInfo {
                    kind: "web.tab.current".into(),
                },
            ),
            (
                "aw-watcher-web-firefox".to_string(),
                BucketInfo {
                    kind: "web.tab.current".into(),
                },
            ),
        ])
    }

    fn event(window: &DayWindow, minute: i64, duration: f64, data: serde_json::Value) -> TrackerEvent {
        TrackerEvent {
            timestamp: (window.start() + Duration::minutes(minute)).with_timezone(&Utc),
            duration,
            data: data.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_event_deserializes_from_server_format() -> Result<()> {
        let event: TrackerEvent = serde_json::from_str(
            r#"{"id": 1, "timestamp": "2026-02-10T01:02:03.456000+00:00", "duration": 12.5,
                "data": {"app": "Code", "title": "main.rs"}}"#,
        )?;
        assert_eq!(event.duration, 12.5);
        assert_eq!(event.text("app"), Some("Code"));
        Ok(())
    }

    #[tokio::test]
    async fn test_window_reader_filters_and_sorts() -> Result<()> {
        *TEST_LOGGING;
        let window = window();
        let events = vec![
            event(&window, 120, 600., json!({"app": "Code", "title": "lib.rs"})),
            event(&window, 60, 300., json!({"app": "loginwindow", "title": ""})),
            event(&window, 30, 5., json!({"app": "Finder", "title": "short"})),
            event(&window, 10, 60., json!({"app": "Slack", "title": "general"})),
            // Started before midnight, gets clamped to the window start.
            event(&window, -5, 600., json!({"app": "Terminal", "title": "zsh"})),
        ];
        let mut api = MockTrackerApi::new();
        api.expect_buckets().returning(|| Ok(buckets()));
        api.expect_events()
            .with(eq("aw-watcher-window_host"), eq(window))
            .returning(move |_, _| Ok(events.clone()));

        let reader = WindowActivityReader::new(Arc::new(api), 10.);
        let records = reader.read(&window).await?;

        let apps = records
            .iter()
            .map(|v| match &v.activity {
                Activity::AppUsage { app, .. } => app.as_str(),
                _ => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(apps, vec!["Terminal", "Slack", "Code"]);
        assert_eq!(records[0].start, window.start());
        assert_eq!(records[0].duration(), Duration::minutes(5));
        Ok(())
    }

    #[tokio::test]
    async fn test_window_reader_requires_bucket() {
        let mut api = MockTrackerApi::new();
        api.expect_buckets().returning(|| Ok(BTreeMap::new()));
        let reader = WindowActivityReader::new(Arc::new(api), 10.);
        assert!(reader.read(&window()).await.is_err());
    }

    #[tokio::test]
    async fn test_web_reader_merges_buckets_and_skips_failures() -> Result<()> {
        *TEST_LOGGING;
        let window = window();
        let chrome = vec![
            event(&window, 50, 30., json!({"url": "https://github.com/a/b/pull/1", "title": "PR"})),
            event(&window, 51, 30., json!({"url": "", "title": "blank"})),
        ];
        let mut api = MockTrackerApi::new();
        api.expect_buckets().returning(|| Ok(buckets()));
        api.expect_events()
            .with(eq("aw-watcher-web-chrome"), eq(window))
            .returning(move |_, _| Ok(chrome.clone()));
        api.expect_events()
            .with(eq("aw-watcher-web-firefox"), eq(window))
            .returning(|_, _| Err(anyhow!("connection reset")));

        let reader = WebActivityReader::new(Arc::new(api), 10.);
        let records = reader.read(&window).await?;
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].activity,
            Activity::WebVisit {
                url: "https://github.com/a/b/pull/1".into(),
                domain: "github.com".into(),
                title: "PR".into(),
            }
        );
        Ok(())
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://docs.rs/chrono/latest"), "docs.rs");
        assert_eq!(domain_of("about:blank"), "about:blank");
        assert_eq!(domain_of("http://localhost:3000/login"), "localhost:3000");
        assert_eq!(domain_of("http://localhost:8080/"), "localhost:8080");
        assert_eq!(domain_of("https://github.com:443/a"), "github.com");
    }

    #[tokio::test]
    async fn test_absurd_durations_are_skipped() -> Result<()> {
        let window = window();
        assert!(event(&window, 10, 1e300, json!({})).span(&window).is_none());
        assert!(event(&window, 10, f64::INFINITY, json!({})).span(&window).is_none());

        let events = vec![
            event(&window, 10, 1e300, json!({"app": "Broken", "title": "x"})),
            event(&window, 20, 60., json!({"app": "Code", "title": "main.rs"})),
        ];
        let mut api = MockTrackerApi::new();
        api.expect_buckets().returning(|| Ok(buckets()));
        api.expect_events()
            .returning(move |_, _| Ok(events.clone()));

        let records = WindowActivityReader::new(Arc::new(api), 10.)
            .read(&window)
            .await?;
        assert_eq!(records.len(), 1);
        assert!(matches!(
            &records[0].activity,
            Activity::AppUsage { app, .. } if app == "Code"
        ));
        Ok(())
    }
}
